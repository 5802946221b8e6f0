use nalgebra::*;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::model::Model;

/// Validation and counting of the class labels informed to the fit.
pub mod labels;

/// First-order class statistics and the within/between-class scatter matrices.
pub mod scatter;

/// Eigendecomposition of general (non-symmetric) real matrices, yielding
/// possibly complex eigenvalues and right eigenvectors.
pub mod eigen;

use labels::LabelSet;
use scatter::ClassStats;
use eigen::EigenPairs;

/// Reasons a discriminant analysis cannot be carried. No partial model
/// is ever produced when any of those is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {

    #[error("The sizes of X and Y don't match ({rows} rows, {labels} labels)")]
    LabelCount { rows : usize, labels : usize },

    #[error("No data to analyze")]
    Empty,

    #[error("Negative class label {0}")]
    NegativeLabel(i64),

    #[error("Labels do not start from zero (smallest label is {0})")]
    LabelOrigin(i64),

    #[error("Missing class {0}")]
    MissingClass(i64),

    #[error("Only one class")]
    SingleClass,

    #[error("Sample size {n} too small for {k} classes")]
    SampleSize { n : usize, k : usize },

    #[error("Invalid tolerance {0}")]
    Tolerance(f64),

    #[error("Non-finite value at row {row}, column {col}")]
    NonFinite { row : usize, col : usize },

    #[error("Near-singular covariance: feature {feature} has within-class variance {variance}")]
    Singular { feature : usize, variance : f64 },

    #[error("Within-class scatter matrix is not invertible")]
    NotInvertible,

    #[error("Eigendecomposition failed")]
    Decomposition

}

/// Numerical settings of the fit. The defaults reproduce the usual
/// behavior: a variance tolerance of 1e-4 (squared before comparison)
/// and discriminant axes ordered by decreasing eigenvalue modulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {

    /// Features whose pooled within-class variance is smaller than tol^2
    /// make the fit fail.
    pub tol : f64,

    /// Sort eigenpairs by decreasing eigenvalue modulus. When false, the
    /// eigensolver order is preserved, and transform(.) might not project
    /// onto the most discriminant axes first.
    pub sort_eigenpairs : bool,

    /// Maximum number of Schur iterations (zero for no limit).
    pub max_iter : usize

}

impl Default for FitSettings {

    fn default() -> Self {
        Self {
            tol : 1e-4,
            sort_eigenpairs : true,
            max_iter : 10_000
        }
    }

}

/// Fits a linear discriminant model to the n x p matrix x, where each
/// row is an observation and each column a variable, using the default settings.
/// Labels in y must cover the contiguous range 0..k with k >= 2 and n > k.
pub fn fit(x : &DMatrix<f64>, y : &[i64]) -> Result<Model, FitError> {
    fit_with(x, y, &FitSettings::default())
}

/// Fits a linear discriminant model with the informed settings. The axes are the
/// eigenvectors of Sw^-1 Sb, where Sw is the pooled within-class covariance
/// and Sb the between-class scatter matrix.
pub fn fit_with(x : &DMatrix<f64>, y : &[i64], settings : &FitSettings) -> Result<Model, FitError> {
    let (n, p) = x.shape();
    let labels = LabelSet::validate(y, n)?;
    let k = labels.k();
    if !settings.tol.is_finite() || settings.tol < 0.0 {
        return Err(FitError::Tolerance(settings.tol));
    }
    if let Some(pos) = x.iter().position(|v| !v.is_finite() ) {
        // Column-major storage.
        return Err(FitError::NonFinite { row : pos % n, col : pos / n });
    }
    log::debug!("Class counts: {:?}", labels.counts());

    let stats = ClassStats::new(x, y, &labels);
    let sw = scatter::within_class(x, y, &stats);
    log::debug!("Within-class variances: {:?}", sw.diagonal().as_slice());
    scatter::check_variance(&sw, settings.tol)?;
    let sb = scatter::between_class(&stats, &labels);

    let sw_inv = sw.try_inverse().ok_or(FitError::NotInvertible)?;
    if sw_inv.iter().any(|v| !v.is_finite() ) {
        return Err(FitError::NotInvertible);
    }
    let eigen = EigenPairs::new(&sw_inv * &sb, settings.sort_eigenpairs, settings.max_iter)?;
    log::debug!("Eigenvalues: {:?}", eigen.values.as_slice());
    log::info!("Fitted discriminant axes for {} classes over {} observations of {} variables", k, n, p);

    Ok(Model::new(n, p, stats.class_means, stats.log_priors, eigen.vectors, eigen.values))
}

#[test]
fn fit_two_gaussian_classes() {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.5).unwrap();
    let n = 60;
    let mut y = Vec::new();
    let x = DMatrix::from_fn(n, 3, |i, j| {
        let center = if i < n / 2 { 0.0 } else { 4.0 };
        center * (j as f64 + 1.0) + noise.sample(&mut rng)
    });
    for i in 0..n {
        y.push(if i < n / 2 { 0 } else { 1 });
    }
    let model = fit(&x, &y).unwrap();
    assert_eq!(model.k(), 2);
    assert_eq!(model.p(), 3);
    assert_eq!(model.class_means().shape(), (2, 3));

    // Only one axis separates two classes.
    let moduli : Vec<f64> = model.eigenvalues().iter().map(|v| v.norm() ).collect();
    assert!(moduli[0] > 1.0);
    assert!(moduli[1] < 1e-6 * moduli[0]);
    assert!(moduli[2] < 1e-6 * moduli[0]);
}

#[test]
fn rejects_invalid_settings_and_values() {
    let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 5.0, 7.0]);
    let y = [0, 0, 1, 1];
    let mut settings = FitSettings::default();
    settings.tol = -1.0;
    assert_eq!(fit_with(&x, &y, &settings).err(), Some(FitError::Tolerance(-1.0)));
    let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 2.0, 1.0, 5.0, f64::NAN, 7.0, 2.0]);
    assert_eq!(fit(&x, &y).err(), Some(FitError::NonFinite { row : 2, col : 1 }));
}

#[test]
fn collinear_features_are_not_invertible() {
    let x = DMatrix::from_row_slice(6, 2, &[
        1.0, 2.0,
        2.0, 4.0,
        3.0, 6.0,
        7.0, 14.0,
        8.0, 16.0,
        10.0, 20.0
    ]);
    let y = [0, 0, 0, 1, 1, 1];
    assert_eq!(fit(&x, &y).err(), Some(FitError::NotInvertible));
}
