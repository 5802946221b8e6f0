use nalgebra::*;
use thiserror::Error;
use crate::model::Model;

/// Relative round-off of a computed eigenvalue, per variable. An eigen-axis whose
/// eigenvalue modulus does not exceed p * DEGENERATE_AXIS * max |lambda| is a numerical
/// zero: it lies in the null space of the between-class scatter, where every class mean
/// has the same projection, and does not enter the discriminant scores. Every other axis does,
/// however small its eigenvalue.
pub const DEGENERATE_AXIS : f64 = 16.0 * f64::EPSILON;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {

    #[error("Invalid input vector size (expected {expected}, found {found})")]
    FeatureCount { expected : usize, found : usize },

    #[error("Non-finite value at column {col}")]
    NonFinite { col : usize },

    #[error("{rows} observation rows but {labels} labels")]
    LabelCount { rows : usize, labels : usize }

}

/// Value of the discriminant function of each class at x:
/// f_i = log(prior_i) - 0.5 sum_j u_j^2 / |lambda_j|, where u = Re(V)^T (x - mu_i)
/// are the coordinates of x centered at the class i mean in the eigenbasis.
pub fn scores<S>(model : &Model, x : &Matrix<f64, Dynamic, U1, S>) -> Result<DVector<f64>, PredictError>
where
    S : Storage<f64, Dynamic, U1>
{
    let p = model.p();
    if x.nrows() != p {
        return Err(PredictError::FeatureCount { expected : p, found : x.nrows() });
    }
    if let Some(col) = x.iter().position(|v| !v.is_finite() ) {
        return Err(PredictError::NonFinite { col });
    }
    let axes = model.real_eigenvectors();
    let weights = axis_weights(model);
    let mut f = DVector::<f64>::zeros(model.k());
    let mut d = DVector::<f64>::zeros(p);
    for i in 0..model.k() {
        for j in 0..p {
            d[j] = x[j] - model.class_means()[(i, j)];
        }
        let u = axes.tr_mul(&d);
        let dist : f64 = u.iter().zip(weights.iter()).map(|(uj, wj)| uj * uj * wj ).sum();
        f[i] = model.log_priors()[i] - 0.5 * dist;
    }
    Ok(f)
}

/// Reciprocal eigenvalue moduli, with degenerate axes weighted by zero.
fn axis_weights(model : &Model) -> DVector<f64> {
    let moduli = model.eigenvalues().map(|c| c.norm() );
    let cutoff = moduli.nrows() as f64 * DEGENERATE_AXIS * moduli.max();
    moduli.map(|m| if m > cutoff && m > 0.0 { 1. / m } else { 0.0 } )
}

/// Classifies the p-dimensional observation x into the class with the greatest discriminant
/// score. On ties, the class with the smallest index wins.
pub fn predict(model : &Model, x : &[f64]) -> Result<usize, PredictError> {
    let f = scores(model, &DVectorSlice::from_slice(x, x.len()))?;
    Ok(best(&f))
}

/// Classifies each row of the m x p matrix x.
pub fn predict_rows(model : &Model, x : &DMatrix<f64>) -> Result<Vec<usize>, PredictError> {
    if x.ncols() != model.p() {
        return Err(PredictError::FeatureCount { expected : model.p(), found : x.ncols() });
    }
    let mut classes = Vec::with_capacity(x.nrows());
    for row in x.row_iter() {
        let f = scores(model, &row.transpose())?;
        classes.push(best(&f));
    }
    Ok(classes)
}

// Single left-to-right scan with strict comparison.
fn best(f : &DVector<f64>) -> usize {
    let mut y = 0;
    let mut max = f64::NEG_INFINITY;
    for (i, fi) in f.iter().enumerate() {
        if max < *fi {
            max = *fi;
            y = i;
        }
    }
    y
}

/// Counts of predicted classes (columns) against known classes (rows)
/// over a labeled sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Confusion {
    counts : DMatrix<usize>
}

impl Confusion {

    /// Known labels outside 0..k are not counted.
    pub fn new(model : &Model, x : &DMatrix<f64>, y : &[i64]) -> Result<Self, PredictError> {
        if y.len() != x.nrows() {
            return Err(PredictError::LabelCount { rows : x.nrows(), labels : y.len() });
        }
        let k = model.k();
        let mut counts = DMatrix::<usize>::zeros(k, k);
        for (pred, label) in predict_rows(model, x)?.iter().zip(y.iter()) {
            if *label >= 0 && (*label as usize) < k {
                counts[(*label as usize, *pred)] += 1;
            }
        }
        Ok(Self { counts })
    }

    pub fn counts(&self) -> &DMatrix<usize> {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Share of the counted observations on the diagonal (zero if nothing was counted).
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let hits : usize = (0..self.counts.nrows()).map(|i| self.counts[(i, i)] ).sum();
        hits as f64 / total as f64
    }

}

#[cfg(test)]
fn separated_model() -> (Model, DMatrix<f64>, Vec<i64>) {
    let x = DMatrix::from_row_slice(9, 2, &[
        0.0, 0.2,
        0.3, -0.1,
        -0.2, 0.1,
        5.0, 0.1,
        5.2, 0.3,
        4.9, -0.2,
        0.1, 5.0,
        -0.1, 5.3,
        0.2, 4.8
    ]);
    let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
    (crate::fit::fit(&x, &y).unwrap(), x, y)
}

#[test]
fn classifies_near_class_means() {
    let (model, x, y) = separated_model();
    assert_eq!(predict(&model, &[0.0, 0.0]), Ok(0));
    assert_eq!(predict(&model, &[5.1, 0.0]), Ok(1));
    assert_eq!(predict(&model, &[0.0, 5.1]), Ok(2));
    let confusion = Confusion::new(&model, &x, &y).unwrap();
    assert_eq!(confusion.total(), 9);
    assert_eq!(confusion.accuracy(), 1.0);
    assert_eq!(predict_rows(&model, &x).unwrap(), vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
}

#[test]
fn prediction_is_deterministic() {
    let (model, _, _) = separated_model();
    let x = [2.4, 2.6];
    let first = predict(&model, &x).unwrap();
    for _ in 0..10 {
        assert_eq!(predict(&model, &x).unwrap(), first);
    }
    let f = scores(&model, &DVector::from_vec(x.to_vec())).unwrap();
    assert_eq!(f.nrows(), 3);
    assert_eq!(first, best(&f));
}

#[test]
fn rejects_wrong_dimension() {
    let (model, x, _) = separated_model();
    assert_eq!(predict(&model, &[1.0]), Err(PredictError::FeatureCount { expected : 2, found : 1 }));
    assert_eq!(predict(&model, &[1.0, 2.0, 3.0]), Err(PredictError::FeatureCount { expected : 2, found : 3 }));
    assert_eq!(Confusion::new(&model, &x, &[0, 1]), Err(PredictError::LabelCount { rows : 9, labels : 2 }));
}

#[test]
fn rejects_non_finite_observations() {
    let (model, x, y) = separated_model();
    assert_eq!(predict(&model, &[f64::NAN, 0.0]), Err(PredictError::NonFinite { col : 0 }));
    assert_eq!(predict(&model, &[0.0, f64::INFINITY]), Err(PredictError::NonFinite { col : 1 }));
    let mut bad = x.clone();
    bad[(4, 1)] = f64::NEG_INFINITY;
    assert_eq!(predict_rows(&model, &bad), Err(PredictError::NonFinite { col : 1 }));
    assert_eq!(Confusion::new(&model, &bad, &y), Err(PredictError::NonFinite { col : 1 }));
}

// Three classes where the second discriminant axis carries an eigenvalue about
// 1e-10 times the first, separating two class means only 0.01 apart.
#[test]
fn small_eigenvalue_axis_still_discriminates() {
    let means = [(0.0, 0.0), (0.0, 0.01), (1000.0, 0.0)];
    let offsets = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];
    let mut data = Vec::new();
    let mut y = Vec::new();
    for (c, m) in means.iter().enumerate() {
        for o in offsets.iter() {
            data.push(m.0 + o.0);
            data.push(m.1 + o.1);
            y.push(c as i64);
        }
    }
    let x = DMatrix::from_row_slice(12, 2, &data[..]);
    let model = crate::fit::fit(&x, &y).unwrap();
    let moduli = model.eigenvalues().map(|c| c.norm() );
    assert!(moduli[1] / moduli[0] < 1e-9);
    assert!(axis_weights(&model).iter().all(|w| *w > 0.0 ));

    assert_eq!(predict(&model, &[0.0, 0.01]), Ok(1));
    assert_eq!(predict(&model, &[0.0, 0.0]), Ok(0));
    assert_eq!(predict(&model, &[1000.0, 0.0]), Ok(2));
    let f = scores(&model, &DVector::from_vec(vec![0.0, 0.01])).unwrap();
    assert!((f[0] - (-1.2652789553)).abs() < 1e-4);
    assert!((f[1] - (1.0f64 / 3.0).ln()).abs() < 1e-4);
    assert!((f[2] - (-1.2652789553)).abs() < 1e-4);
}

#[test]
fn ties_resolve_to_lowest_class() {
    assert_eq!(best(&DVector::from_vec(vec![-1.0, 0.5, 0.5])), 1);
    assert_eq!(best(&DVector::from_vec(vec![2.0, 2.0])), 0);
    assert_eq!(best(&DVector::from_vec(vec![f64::NAN, -3.0])), 1);
}
