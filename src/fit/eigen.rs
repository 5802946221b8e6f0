use nalgebra::*;
use std::cmp::Ordering;
use super::FitError;

/// Relative shifts applied to an eigenvalue before factorizing M - sigma I.
/// Larger shifts are only tried when the factor is exactly singular.
const PERTURBATIONS : [f64; 3] = [1e-10, 1e-7, 1e-4];

const INVERSE_ITERATIONS : usize = 3;

/// Eigenvalues closer than this (relative to the matrix scale) are treated
/// as one repeated eigenvalue, and receive mutually orthogonal eigenvectors.
const CLUSTER_TOL : f64 = 1e-8;

/// Right eigenpairs of a general (not necessarily symmetric) real matrix.
/// Column j of vectors pairs with values[j]. Eigenvectors have unit
/// Euclidean norm, and their largest-modulus entry is real and positive, so
/// that eigenvectors of real eigenvalues are real up to round-off.
#[derive(Debug, Clone)]
pub struct EigenPairs {

    pub values : DVector<Complex<f64>>,

    pub vectors : DMatrix<Complex<f64>>
}

impl EigenPairs {

    /// Eigenvalues are read from the real Schur form of m (at most max_iter
    /// QR sweeps; zero means no limit). Each eigenvector is then recovered by complex
    /// inverse iteration. When sorted is true, pairs are ordered by decreasing eigenvalue
    /// modulus (ties keep the Schur order); otherwise the Schur order is kept.
    pub fn new(m : DMatrix<f64>, sorted : bool, max_iter : usize) -> Result<Self, FitError> {
        let p = m.nrows();
        let amax = m.amax();
        let scale = if amax > 0.0 && amax.is_finite() { amax } else { 1.0 };
        let cm = m.map(|v| Complex::new(v, 0.0) );

        let schur = Schur::try_new(m, f64::EPSILON, max_iter)
            .ok_or(FitError::Decomposition)?;
        let mut values : Vec<Complex<f64>> = schur.complex_eigenvalues().iter().cloned().collect();
        if values.iter().any(|v| !v.re.is_finite() || !v.im.is_finite() ) {
            return Err(FitError::Decomposition);
        }
        if sorted {
            values.sort_by(|a, b| b.norm().partial_cmp(&a.norm()).unwrap_or(Ordering::Equal) );
        }

        let mut vectors = DMatrix::<Complex<f64>>::zeros(p, p);
        for j in 0..p {
            let lambda = values[j];
            let cluster : Vec<DVector<Complex<f64>>> = (0..j)
                .filter(|i| (values[*i] - lambda).norm() <= CLUSTER_TOL * scale )
                .map(|i| vectors.column(i).clone_owned() )
                .collect();
            let v = inverse_iteration(&cm, lambda, &cluster[..], scale)?;
            vectors.set_column(j, &v);
        }
        Ok(Self { values : DVector::from_vec(values), vectors })
    }

}

fn inverse_iteration(
    m : &DMatrix<Complex<f64>>,
    lambda : Complex<f64>,
    cluster : &[DVector<Complex<f64>>],
    scale : f64
) -> Result<DVector<Complex<f64>>, FitError> {
    let p = m.nrows();
    let start = start_vector(p, cluster).ok_or(FitError::Decomposition)?;
    'shift : for delta in PERTURBATIONS.iter() {
        let shift = lambda + Complex::new(delta * scale, 0.0);
        let mut shifted = m.clone();
        for i in 0..p {
            shifted[(i, i)] -= shift;
        }
        let lu = shifted.lu();
        let mut v = start.clone();
        for _ in 0..INVERSE_ITERATIONS {
            v = match lu.solve(&v).and_then(|w| unit(orthogonalize(w, cluster)) ) {
                Some(w) => w,
                None => continue 'shift
            };
        }
        return Ok(fix_phase(v));
    }
    Err(FitError::Decomposition)
}

/// A unit vector orthogonal to the cluster. The dense vector with entries 1/sqrt(i+1)
/// is preferred; if the cluster nearly spans it, the canonical basis vector
/// with the largest component outside the cluster is used instead.
fn start_vector(p : usize, cluster : &[DVector<Complex<f64>>]) -> Option<DVector<Complex<f64>>> {
    let dense = unit(DVector::from_fn(p, |i, _| Complex::new(1.0 / ((i + 1) as f64).sqrt(), 0.0) ))?;
    let dense = orthogonalize(dense, cluster);
    if dense.norm() >= 0.5 {
        return unit(dense);
    }
    let mut best : Option<DVector<Complex<f64>>> = None;
    for i in 0..p {
        let mut e = DVector::<Complex<f64>>::zeros(p);
        e[i] = Complex::new(1.0, 0.0);
        let e = orthogonalize(e, cluster);
        if best.as_ref().map(|b| e.norm() > b.norm() ).unwrap_or(true) {
            best = Some(e);
        }
    }
    best.and_then(unit)
}

/// Removes from w its components along the (orthonormal) cluster vectors.
fn orthogonalize(mut w : DVector<Complex<f64>>, cluster : &[DVector<Complex<f64>>]) -> DVector<Complex<f64>> {
    for u in cluster.iter() {
        let proj = u.dotc(&w);
        w -= u * proj;
    }
    w
}

fn unit(w : DVector<Complex<f64>>) -> Option<DVector<Complex<f64>>> {
    let norm = w.norm();
    if norm.is_finite() && norm > f64::MIN_POSITIVE {
        Some(w.map(|c| c / norm ))
    } else {
        None
    }
}

/// Rotates v so that its largest-modulus entry (the first one, on ties) is real and positive.
fn fix_phase(v : DVector<Complex<f64>>) -> DVector<Complex<f64>> {
    let pivot = v.iter().fold(Complex::new(0.0, 0.0), |best, c| if c.norm() > best.norm() { *c } else { best } );
    let modulus = pivot.norm();
    if modulus == 0.0 {
        return v;
    }
    let rot = pivot.conj() / modulus;
    v.map(|c| c * rot )
}

#[cfg(test)]
fn max_residual(m : &DMatrix<f64>, eig : &EigenPairs) -> f64 {
    let cm = m.map(|v| Complex::new(v, 0.0) );
    let mut worst : f64 = 0.0;
    for j in 0..m.nrows() {
        let v = eig.vectors.column(j).clone_owned();
        let r = &cm * &v - v.map(|c| c * eig.values[j] );
        worst = worst.max(r.norm());
    }
    worst
}

#[test]
fn triangular_eigenpairs_are_sorted() {
    let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 3.0]);
    let eig = EigenPairs::new(m.clone(), true, 0).unwrap();
    assert!((eig.values[0] - Complex::new(3.0, 0.0)).norm() < 1e-10);
    assert!((eig.values[1] - Complex::new(2.0, 0.0)).norm() < 1e-10);
    assert!(max_residual(&m, &eig) < 1e-8);

    // Real eigenvalues yield real eigenvectors with a positive leading entry.
    let s = 0.5f64.sqrt();
    assert!((eig.vectors[(0, 0)] - Complex::new(s, 0.0)).norm() < 1e-8);
    assert!((eig.vectors[(1, 0)] - Complex::new(s, 0.0)).norm() < 1e-8);
    assert!((eig.vectors[(0, 1)] - Complex::new(1.0, 0.0)).norm() < 1e-8);
    assert!(eig.vectors[(1, 1)].norm() < 1e-8);
}

#[test]
fn rotation_has_complex_eigenpairs() {
    let m = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
    let eig = EigenPairs::new(m.clone(), true, 0).unwrap();
    for j in 0..2 {
        assert!((eig.values[j].norm() - 1.0).abs() < 1e-10);
        assert!(eig.values[j].re.abs() < 1e-10);
    }
    assert!((eig.values[0].im + eig.values[1].im).abs() < 1e-10);
    assert!(max_residual(&m, &eig) < 1e-8);
}

#[test]
fn repeated_eigenvalue_yields_orthonormal_basis() {
    let m = DMatrix::<f64>::identity(3, 3) * 2.0;
    let eig = EigenPairs::new(m.clone(), false, 0).unwrap();
    let gram = eig.vectors.adjoint() * &eig.vectors;
    for i in 0..3 {
        assert!((eig.values[i] - Complex::new(2.0, 0.0)).norm() < 1e-12);
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((gram[(i, j)] - Complex::new(expected, 0.0)).norm() < 1e-8);
        }
    }
    assert!(max_residual(&m, &eig) < 1e-8);
}

#[test]
fn unsorted_keeps_the_same_spectrum() {
    let m = DMatrix::from_row_slice(3, 3, &[
        1.0, 2.0, 0.0,
        0.5, 4.0, 1.0,
        0.0, 1.0, 9.0
    ]);
    let sorted = EigenPairs::new(m.clone(), true, 0).unwrap();
    let unsorted = EigenPairs::new(m.clone(), false, 0).unwrap();
    for v in unsorted.values.iter() {
        assert!(sorted.values.iter().any(|s| (s - v).norm() < 1e-9 ));
    }
    for j in 1..3 {
        assert!(sorted.values[j - 1].norm() >= sorted.values[j].norm());
    }
    assert!(max_residual(&m, &unsorted) < 1e-8);
}
