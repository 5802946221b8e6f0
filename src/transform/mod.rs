use nalgebra::*;
use thiserror::Error;
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {

    #[error("Cannot project onto {requested} axes (model has {available})")]
    Dimensions { requested : usize, available : usize },

    #[error("Expected {expected} columns, found {found}")]
    FeatureCount { expected : usize, found : usize }

}

/// Projects each row of the m x p matrix x onto the first dims discriminant axes,
/// returning an m x dims matrix. The axes are the real parts of the model
/// eigenvectors, taken in the order they are stored in the model
/// (decreasing eigenvalue modulus unless the fit was told not to sort them).
/// The number of rows of x is unrelated to the training sample size.
pub fn transform(model : &Model, x : &DMatrix<f64>, dims : usize) -> Result<DMatrix<f64>, TransformError> {
    if dims == 0 || dims > model.p() {
        return Err(TransformError::Dimensions { requested : dims, available : model.p() });
    }
    if x.ncols() != model.p() {
        return Err(TransformError::FeatureCount { expected : model.p(), found : x.ncols() });
    }
    let w = DMatrix::from_fn(model.p(), dims, |i, j| model.eigenvectors()[(i, j)].re );
    Ok(x * w)
}

#[test]
fn projects_on_leading_axes() {
    use crate::fit::fit;
    use approx::assert_relative_eq;

    let x = DMatrix::from_row_slice(6, 2, &[
        0.0, 0.1,
        0.2, -0.1,
        -0.1, 0.0,
        3.0, 0.1,
        3.1, -0.2,
        2.9, 0.1
    ]);
    let y = [0, 0, 0, 1, 1, 1];
    let model = fit(&x, &y).unwrap();
    let z = transform(&model, &x, 1).unwrap();
    assert_eq!(z.shape(), (6, 1));

    let w = model.real_eigenvectors();
    for i in 0..6 {
        assert_relative_eq!(z[(i, 0)], x[(i, 0)] * w[(0, 0)] + x[(i, 1)] * w[(1, 0)], epsilon = 1e-12);
    }

    // The leading axis separates the classes.
    let lo = (0..3).map(|i| z[(i, 0)] ).fold(f64::INFINITY, f64::min);
    let hi = (0..3).map(|i| z[(i, 0)] ).fold(f64::NEG_INFINITY, f64::max);
    let others : Vec<f64> = (3..6).map(|i| z[(i, 0)] ).collect();
    assert!(others.iter().all(|v| *v > hi ) || others.iter().all(|v| *v < lo ));

    let unseen = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
    assert_eq!(transform(&model, &unseen, 2).unwrap().shape(), (1, 2));
}

#[test]
fn rejects_invalid_dimensions() {
    use crate::fit::fit;

    let x = DMatrix::from_row_slice(5, 2, &[0.0, 0.3, 0.5, 0.1, 0.2, 0.9, 4.0, 1.0, 4.5, 0.0]);
    let model = fit(&x, &[0, 0, 0, 1, 1]).unwrap();
    assert_eq!(transform(&model, &x, 0), Err(TransformError::Dimensions { requested : 0, available : 2 }));
    assert_eq!(transform(&model, &x, 3), Err(TransformError::Dimensions { requested : 3, available : 2 }));
    let wide = DMatrix::<f64>::zeros(2, 3);
    assert_eq!(transform(&model, &wide, 1), Err(TransformError::FeatureCount { expected : 2, found : 3 }));
}
