use nalgebra::*;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use std::fs::File;
use std::io::{Read, Write};
use std::fmt::{self, Display};
use std::convert::AsRef;
use std::path::Path;

#[derive(Debug, Error)]
pub enum ModelError {

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent model: {0}")]
    Inconsistent(String)

}

/// Result of a linear discriminant analysis over n observations of p
/// variables distributed over k classes. A model is only built by
/// fit(.) (or read back from a file written by a fitted model) and is
/// never modified afterwards; transform(.) and predict(.) only read it,
/// so a single model can be shared across threads.
///
/// The discriminant axes are the right eigenvectors of Sw^-1 Sb, which might
/// be complex in general. Downstream consumers use the real part of
/// the eigenvectors and the modulus of the eigenvalues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {

    n : usize,

    p : usize,

    k : usize,

    // Row i is the mean vector of class i.
    class_means : DMatrix<f64>,

    // Natural log of the empirical prior (class count / n) of each class.
    log_priors : DVector<f64>,

    // Column j pairs with eigenvalues[j]. Both come from the same decomposition.
    eigenvectors : DMatrix<Complex<f64>>,

    eigenvalues : DVector<Complex<f64>>
}

impl Model {

    pub(crate) fn new(
        n : usize,
        p : usize,
        class_means : DMatrix<f64>,
        log_priors : DVector<f64>,
        eigenvectors : DMatrix<Complex<f64>>,
        eigenvalues : DVector<Complex<f64>>
    ) -> Self {
        let k = class_means.nrows();
        Self { n, p, k, class_means, log_priors, eigenvectors, eigenvalues }
    }

    /// Number of training observations.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of variables.
    pub fn p(&self) -> usize {
        self.p
    }

    /// Number of classes.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn class_means(&self) -> &DMatrix<f64> {
        &self.class_means
    }

    pub fn log_priors(&self) -> &DVector<f64> {
        &self.log_priors
    }

    /// Empirical class probabilities (class count / n).
    pub fn priors(&self) -> DVector<f64> {
        self.log_priors.map(|lp| lp.exp() )
    }

    pub fn eigenvalues(&self) -> &DVector<Complex<f64>> {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &DMatrix<Complex<f64>> {
        &self.eigenvectors
    }

    /// Real part of the eigenvectors, which is what the projection and
    /// classification actually use.
    pub fn real_eigenvectors(&self) -> DMatrix<f64> {
        self.eigenvectors.map(|c| c.re )
    }

    /// Share of the summed eigenvalue moduli carried by each axis. All entries are zero
    /// when every eigenvalue is zero.
    pub fn explained_ratio(&self) -> DVector<f64> {
        let moduli = self.eigenvalues.map(|c| c.norm() );
        let total = moduli.sum();
        if total > 0.0 {
            moduli / total
        } else {
            DVector::zeros(self.p)
        }
    }

    /// Verifies that the dimensions of all stored quantities agree with each other. Models
    /// built by fit(.) always pass; models read from external sources are checked at load(.).
    pub fn check(&self) -> Result<(), ModelError> {
        let (n, p, k) = (self.n, self.p, self.k);
        if k < 2 || n <= k || p == 0 {
            return Err(ModelError::Inconsistent(format!("n = {}, p = {}, k = {}", n, p, k)));
        }
        if self.class_means.shape() != (k, p) {
            return Err(ModelError::Inconsistent(format!("class means have shape {:?}", self.class_means.shape())));
        }
        if self.log_priors.nrows() != k {
            return Err(ModelError::Inconsistent(format!("{} log-priors for {} classes", self.log_priors.nrows(), k)));
        }
        if self.log_priors.iter().any(|lp| !lp.is_finite() || *lp > 0.0 ) {
            return Err(ModelError::Inconsistent(format!("invalid log-priors {:?}", self.log_priors.as_slice())));
        }
        if self.eigenvectors.shape() != (p, p) || self.eigenvalues.nrows() != p {
            return Err(ModelError::Inconsistent(format!(
                "eigenvectors with shape {:?} and {} eigenvalues for {} variables",
                self.eigenvectors.shape(),
                self.eigenvalues.nrows(),
                p
            )));
        }
        let finite = |c : &Complex<f64>| c.re.is_finite() && c.im.is_finite();
        if !self.eigenvectors.iter().all(finite) || !self.eigenvalues.iter().all(finite) {
            return Err(ModelError::Inconsistent(String::from("non-finite eigenpairs")));
        }
        Ok(())
    }

    pub fn load_from_path<P>(path : P) -> Result<Self, ModelError>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(reader : R) -> Result<Self, ModelError>
    where
        R : Read
    {
        let model : Model = serde_json::from_reader(reader)?;
        model.check()?;
        Ok(model)
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<(), ModelError>
    where
        P : AsRef<Path>
    {
        let file = File::create(path)?;
        self.save(file)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<(), ModelError>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(&self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

}

impl Display for Model {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Linear discriminant (n = {}, p = {}, k = {})", self.n, self.p, self.k)?;
        writeln!(f, "{:<8}{:<12}Mean", "Class", "Prior")?;
        let priors = self.priors();
        for i in 0..self.k {
            let mean : Vec<String> = self.class_means.row(i).iter().map(|m| format!("{:.4}", m) ).collect();
            writeln!(f, "{:<8}{:<12.4}{}", i, priors[i], mean.join(" "))?;
        }
        writeln!(f, "{:<8}{:<28}Explained", "Axis", "Eigenvalue")?;
        let explained = self.explained_ratio();
        for (j, value) in self.eigenvalues.iter().enumerate() {
            let value = if value.im == 0.0 {
                format!("{:.6e}", value.re)
            } else {
                format!("{:.6e}{:+.6e}i", value.re, value.im)
            };
            writeln!(f, "{:<8}{:<28}{:.4}", j, value, explained[j])?;
        }
        Ok(())
    }

}

#[cfg(test)]
fn toy_model() -> Model {
    let class_means = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
    let log_priors = DVector::from_vec(vec![(0.25f64).ln(), (0.75f64).ln()]);
    let eigenvectors = DMatrix::from_row_slice(2, 2, &[
        Complex::new(1.0, 0.0), Complex::new(0.0, 0.0),
        Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)
    ]);
    let eigenvalues = DVector::from_vec(vec![Complex::new(3.0, 0.0), Complex::new(0.0, -1.0)]);
    Model::new(8, 2, class_means, log_priors, eigenvectors, eigenvalues)
}

#[test]
fn derived_quantities() {
    use approx::assert_relative_eq;

    let model = toy_model();
    assert!(model.check().is_ok());
    assert_relative_eq!(model.priors(), DVector::from_vec(vec![0.25, 0.75]), epsilon = 1e-12);
    assert_relative_eq!(model.explained_ratio(), DVector::from_vec(vec![0.75, 0.25]), epsilon = 1e-12);
    assert_eq!(model.real_eigenvectors(), DMatrix::<f64>::identity(2, 2));
    let summary = format!("{}", model);
    assert!(summary.starts_with("Linear discriminant (n = 8, p = 2, k = 2)"));
}

#[test]
fn json_round_trip() {
    let model = toy_model();
    let mut buffer : Vec<u8> = Vec::new();
    model.save(&mut buffer).unwrap();
    let loaded = Model::load(&buffer[..]).unwrap();
    assert_eq!((loaded.n(), loaded.p(), loaded.k()), (8, 2, 2));
    assert_eq!(loaded.class_means(), model.class_means());
    assert_eq!(loaded.eigenvectors(), model.eigenvectors());
    assert_eq!(loaded.eigenvalues(), model.eigenvalues());
    for (a, b) in loaded.log_priors().iter().zip(model.log_priors().iter()) {
        assert!((a - b).abs() < 1e-15);
    }
}

#[test]
fn load_rejects_inconsistent_shapes() {
    let mut model = toy_model();
    model.log_priors = DVector::from_vec(vec![0.0]);
    let mut buffer : Vec<u8> = Vec::new();
    model.save(&mut buffer).unwrap();
    match Model::load(&buffer[..]) {
        Err(ModelError::Inconsistent(_)) => { },
        other => panic!("Unexpected load result: {:?}", other)
    }
}
