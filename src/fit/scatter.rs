use nalgebra::*;
use super::FitError;
use super::labels::LabelSet;

/// First-order statistics of a labeled sample: the global column means,
/// the k x p matrix of class means and the natural log of the empirical
/// class priors.
#[derive(Debug, Clone)]
pub struct ClassStats {

    pub col_mean : DVector<f64>,

    pub class_means : DMatrix<f64>,

    pub log_priors : DVector<f64>
}

impl ClassStats {

    /// Labels in y must already have been validated against labels,
    /// so that every entry indexes a row of the class mean matrix.
    pub fn new(x : &DMatrix<f64>, y : &[i64], labels : &LabelSet) -> Self {
        let (n, p) = x.shape();
        let k = labels.k();

        let col_mean = DVector::from_iterator(p, x.column_iter().map(|col| col.sum() / n as f64 ));

        let mut class_means = DMatrix::<f64>::zeros(k, p);
        for (row, label) in x.row_iter().zip(y.iter()) {
            let c = *label as usize;
            for j in 0..p {
                class_means[(c, j)] += row[j];
            }
        }
        for (c, count) in labels.counts().iter().enumerate() {
            for j in 0..p {
                class_means[(c, j)] /= *count as f64;
            }
        }

        let log_priors = DVector::from_iterator(k, labels.counts().iter()
            .map(|count| (*count as f64 / n as f64).ln() ));

        Self { col_mean, class_means, log_priors }
    }

}

/// Pooled within-class scatter: the sum over all observations of the outer product
/// of their residuals around their own class mean, divided by the n - k degrees of freedom.
/// Only the lower triangle is accumulated; the upper triangle is mirrored afterwards.
pub fn within_class(x : &DMatrix<f64>, y : &[i64], stats : &ClassStats) -> DMatrix<f64> {
    let (n, p) = x.shape();
    let k = stats.class_means.nrows();
    let mut sw = DMatrix::<f64>::zeros(p, p);
    let mut resid = DVector::<f64>::zeros(p);
    for (row, label) in x.row_iter().zip(y.iter()) {
        let c = *label as usize;
        for j in 0..p {
            resid[j] = row[j] - stats.class_means[(c, j)];
        }
        for j in 0..p {
            for l in 0..=j {
                sw[(j, l)] += resid[j] * resid[l];
            }
        }
    }
    for j in 0..p {
        for l in 0..j {
            sw[(l, j)] = sw[(j, l)];
        }
    }
    sw /= (n - k) as f64;
    sw
}

/// Fails when any feature has a within-class variance below tol^2,
/// in which case the scatter matrix is (nearly) singular.
pub fn check_variance(sw : &DMatrix<f64>, tol : f64) -> Result<(), FitError> {
    let tol = tol * tol;
    for (feature, variance) in sw.diagonal().iter().enumerate() {
        if *variance < tol {
            return Err(FitError::Singular { feature, variance : *variance });
        }
    }
    Ok(())
}

/// Between-class scatter: the count-weighted sum of outer products of
/// each class mean deviation from the global mean.
pub fn between_class(stats : &ClassStats, labels : &LabelSet) -> DMatrix<f64> {
    let (k, p) = stats.class_means.shape();
    let mut sb = DMatrix::<f64>::zeros(p, p);
    let mut dev = DVector::<f64>::zeros(p);
    for i in 0..k {
        let ni = labels.counts()[i] as f64;
        for j in 0..p {
            dev[j] = stats.class_means[(i, j)] - stats.col_mean[j];
        }
        for j in 0..p {
            for l in 0..p {
                sb[(j, l)] += ni * dev[j] * dev[l];
            }
        }
    }
    sb
}

#[test]
fn class_statistics() {
    use approx::assert_relative_eq;

    let x = DMatrix::from_row_slice(5, 2, &[
        1.0, 2.0,
        3.0, 2.0,
        5.0, 8.0,
        7.0, 10.0,
        9.0, 12.0
    ]);
    let y = [0, 0, 1, 1, 1];
    let labels = LabelSet::validate(&y, 5).unwrap();
    let stats = ClassStats::new(&x, &y, &labels);
    assert_relative_eq!(stats.col_mean, DVector::from_vec(vec![5.0, 6.8]), epsilon = 1e-12);
    assert_relative_eq!(stats.class_means, DMatrix::from_row_slice(2, 2, &[2.0, 2.0, 7.0, 10.0]), epsilon = 1e-12);
    assert_relative_eq!(stats.log_priors[0], (0.4f64).ln(), epsilon = 1e-12);
    assert_relative_eq!(stats.log_priors[1], (0.6f64).ln(), epsilon = 1e-12);

    // Residuals: (-1, 0), (1, 0), (-2, -2), (0, 0), (2, 2); n - k = 3.
    let sw = within_class(&x, &y, &stats);
    assert_relative_eq!(sw, DMatrix::from_row_slice(2, 2, &[10.0 / 3.0, 8.0 / 3.0, 8.0 / 3.0, 8.0 / 3.0]), epsilon = 1e-12);

    // Deviations: (-3, -4.8) x 2 and (2, 3.2) x 3.
    let sb = between_class(&stats, &labels);
    assert_relative_eq!(sb, DMatrix::from_row_slice(2, 2, &[30.0, 48.0, 48.0, 76.8]), epsilon = 1e-9);
}

#[test]
fn constant_feature_is_singular() {
    let sw = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1e-9]);
    assert_eq!(check_variance(&sw, 1e-4), Err(FitError::Singular { feature : 1, variance : 1e-9 }));
    assert!(check_variance(&sw, 1e-5).is_ok());
}
