//! Linear discriminant analysis (LDA) over labeled real-valued samples.
//!
//! A model is fitted once from an n x p matrix (one observation per row) and a
//! vector of class labels in 0..k. The fit builds the pooled within-class
//! covariance Sw and the between-class scatter Sb, and takes as discriminant
//! axes the eigenvectors of Sw^-1 Sb. The resulting immutable [`Model`] is then used
//! to project observations onto the leading axes ([`transform`]) or to classify
//! them ([`predict`]).
//!
//! ```no_run
//! use lda::table::{LabeledTable, TableSettings};
//!
//! let tbl = LabeledTable::open("iris.csv", &TableSettings::default()).unwrap();
//! let y = tbl.y.clone().unwrap();
//! let model = lda::fit(&tbl.x, &y).unwrap();
//! let reduced = lda::transform(&model, &tbl.x, 2).unwrap();
//! let class = lda::predict(&model, &[5.0, 3.3, 1.4, 0.2]).unwrap();
//! println!("{} rows projected; new flower is {}", reduced.nrows(), tbl.classes[class]);
//! ```

/// Estimation of the discriminant model: label validation, class statistics,
/// scatter matrices and the generalized eigenproblem.
pub mod fit;

/// The fitted model and its persistence.
pub mod model;

/// Dimensionality reduction onto the leading discriminant axes.
pub mod transform;

/// Classification by comparison of the per-class discriminant functions.
pub mod predict;

/// Reading labeled samples from delimited text files.
pub mod table;

pub use fit::{fit, fit_with, FitError, FitSettings};

pub use model::{Model, ModelError};

pub use transform::{transform, TransformError};

pub use predict::{predict, predict_rows, scores, Confusion, PredictError};
