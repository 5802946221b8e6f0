use nalgebra::{DMatrix, DVector, ComplexField, Normed};
use approx::assert_relative_eq;
use lda::*;
use lda::table::{LabeledTable, TableSettings};

const IRIS : &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/iris.csv");

fn iris() -> (DMatrix<f64>, Vec<i64>) {
    let tbl = LabeledTable::open(IRIS, &TableSettings::default()).unwrap();
    assert_eq!(tbl.classes, vec!["Iris-setosa", "Iris-versicolor", "Iris-virginica"]);
    (tbl.x, tbl.y.unwrap())
}

#[test]
fn iris_discriminant_axes() {
    let (x, y) = iris();
    let model = fit(&x, &y).unwrap();
    assert_eq!((model.n(), model.p(), model.k()), (150, 4, 3));
    assert_eq!(model.class_means().shape(), (3, 4));
    assert_relative_eq!(model.class_means()[(0, 0)], 5.006, epsilon = 1e-9);
    assert_relative_eq!(model.priors().sum(), 1.0, epsilon = 1e-12);

    // Two between-class degrees of freedom: the remaining eigenvalues vanish.
    let values = model.eigenvalues();
    assert_relative_eq!(values[0].re, 4743.977828, max_relative = 1e-6);
    assert_relative_eq!(values[1].re, 40.802329, max_relative = 1e-6);
    assert!(values[2].norm() < 1e-6 && values[3].norm() < 1e-6);
    assert!(model.explained_ratio()[0] > 0.99);

    let reduced = transform(&model, &x, 2).unwrap();
    assert_eq!(reduced.shape(), (150, 2));
}

#[test]
fn iris_classification() {
    let (x, y) = iris();
    let model = fit(&x, &y).unwrap();
    assert_eq!(predict(&model, &[5.0, 3.3, 1.4, 0.2]), Ok(0));
    assert_eq!(predict(&model, &[5.1, 2.5, 3.0, 1.1]), Ok(1));
    assert_eq!(predict(&model, &[7.7, 3.0, 6.1, 2.3]), Ok(2));
    assert_eq!(predict(&model, &[6.5, 3.0, 5.8, 2.2]), Ok(2));

    let first = predict_rows(&model, &x).unwrap();
    assert_eq!(first.len(), 150);
    assert!(first.iter().all(|c| *c < 3 ));
    assert_eq!(predict_rows(&model, &x).unwrap(), first);

    let confusion = Confusion::new(&model, &x, &y).unwrap();
    assert_eq!(confusion.total(), 150);
    assert_eq!(confusion.counts().column_sum().sum(), 150);

    assert_eq!(predict(&model, &[5.0, 3.3]), Err(PredictError::FeatureCount { expected : 4, found : 2 }));
    assert_eq!(transform(&model, &x, 5), Err(TransformError::Dimensions { requested : 5, available : 4 }));
    assert_eq!(transform(&model, &x, 0), Err(TransformError::Dimensions { requested : 0, available : 4 }));
}

#[test]
fn iris_model_round_trip() {
    let (x, y) = iris();
    let model = fit(&x, &y).unwrap();
    let mut buf = Vec::new();
    model.save(&mut buf).unwrap();
    let loaded = Model::load(&buf[..]).unwrap();
    assert_eq!(loaded.k(), 3);
    assert_relative_eq!(loaded.real_eigenvectors(), model.real_eigenvectors(), epsilon = 1e-12);
    assert_relative_eq!(loaded.class_means(), model.class_means(), epsilon = 1e-12);
    for row in x.row_iter() {
        let obs : Vec<f64> = row.iter().cloned().collect();
        assert_eq!(predict(&loaded, &obs), predict(&model, &obs));
    }
}

#[test]
fn unsorted_eigenpairs_keep_the_spectrum() {
    let (x, y) = iris();
    let mut settings = FitSettings::default();
    settings.sort_eigenpairs = false;
    let unsorted = fit_with(&x, &y, &settings).unwrap();
    let sorted = fit(&x, &y).unwrap();
    let mut moduli : Vec<f64> = unsorted.eigenvalues().iter().map(|v| v.norm() ).collect();
    moduli.sort_by(|a, b| b.partial_cmp(a).unwrap() );
    for (a, b) in moduli.iter().zip(sorted.eigenvalues().iter()) {
        assert_relative_eq!(*a, b.norm(), epsilon = 1e-6, max_relative = 1e-8);
    }
}

#[test]
fn smallest_admissible_sample() {
    // n = k + 1 is accepted; n = k is not.
    let x = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 5.0]);
    let model = fit(&x, &[0, 0, 1]).unwrap();
    assert_eq!(model.k(), 2);
    assert_eq!(transform(&model, &x, 1).unwrap().shape(), (3, 1));
    // Sw = 0.5 and Sb = 13.5, so the single eigenvalue is 27. The larger prior of
    // class 0 moves the boundary past the class 1 mean.
    assert_relative_eq!(model.eigenvalues()[0].re, 27.0, max_relative = 1e-10);
    let f = scores(&model, &DVector::from_vec(vec![5.0])).unwrap();
    assert_relative_eq!(f[0], (2.0f64 / 3.0).ln() - 0.5 * 20.25 / 27.0, epsilon = 1e-10);
    assert_relative_eq!(f[1], (1.0f64 / 3.0).ln(), epsilon = 1e-10);
    assert_eq!(predict(&model, &[0.4]), Ok(0));
    assert_eq!(predict(&model, &[5.0]), Ok(0));
    assert_eq!(predict(&model, &[9.0]), Ok(1));

    let x = DMatrix::from_column_slice(2, 1, &[0.0, 1.0]);
    assert_eq!(fit(&x, &[0, 1]).unwrap_err(), FitError::SampleSize { n : 2, k : 2 });
}

#[test]
fn invalid_fits() {
    let x = DMatrix::from_row_slice(6, 2, &[
        1.0, 2.0,
        1.5, 2.5,
        1.2, 1.9,
        4.0, 0.5,
        4.2, 0.9,
        3.9, 0.2
    ]);
    assert_eq!(fit(&x, &[1, 1, 1, 2, 2, 2]).unwrap_err(), FitError::LabelOrigin(1));
    assert_eq!(fit(&x, &[0, 0, 0, 2, 2, 2]).unwrap_err(), FitError::MissingClass(1));
    assert_eq!(fit(&x, &[0, 0, 0, 0, 0, 0]).unwrap_err(), FitError::SingleClass);
    assert_eq!(fit(&x, &[0, 0, 1]).unwrap_err(), FitError::LabelCount { rows : 6, labels : 3 });

    let mut constant = x.clone();
    constant.column_mut(1).fill(3.0);
    match fit(&constant, &[0, 0, 0, 1, 1, 1]) {
        Err(FitError::Singular { feature : 1, .. }) => { },
        other => panic!("Unexpected result: {:?}", other)
    }
}

#[test]
fn scores_follow_the_discriminant_function() {
    let x = DMatrix::from_row_slice(9, 2, &[
        1.0, 2.0,
        1.5, 2.6,
        0.8, 1.7,
        4.0, 0.5,
        4.3, 1.1,
        3.6, 0.2,
        2.0, 5.0,
        2.7, 5.6,
        1.9, 4.4
    ]);
    let y = [0, 0, 0, 1, 1, 1, 2, 2, 2];
    let model = fit(&x, &y).unwrap();
    let axes = model.real_eigenvectors();
    for obs in [[1.0, 2.0], [3.0, 3.0], [2.5, 4.0], [-1.0, 7.5]].iter() {
        let f = scores(&model, &DVector::from_vec(obs.to_vec())).unwrap();
        for i in 0..model.k() {
            let d = DVector::from_fn(2, |j, _| obs[j] - model.class_means()[(i, j)] );
            let u = axes.tr_mul(&d);
            let dist : f64 = (0..model.p()).map(|j| u[j] * u[j] / model.eigenvalues()[j].norm() ).sum();
            assert_relative_eq!(f[i], model.log_priors()[i] - 0.5 * dist, epsilon = 1e-9, max_relative = 1e-9);
        }
        let best = (0..model.k()).fold(0, |b, i| if f[i] > f[b] { i } else { b } );
        assert_eq!(predict(&model, &obs[..]), Ok(best));
    }
}
