//! Symmetric matrix helpers built on `nalgebra::SymmetricEigen`.

use nalgebra::{DMatrix, DVector};

use crate::error::{EstimateError, EstimateResult};

/// Eigenvalues below this fraction of the largest are treated as zero.
const MIN_RELATIVE_EIGEN: f64 = 1e-12;

/// Project a symmetric matrix onto the PSD cone by clamping negative eigenvalues to zero.
pub fn project_psd(m: &DMatrix<f64>) -> DMatrix<f64> {
    let sym = symmetrize(m);
    let eig = sym.symmetric_eigen();
    let clamped = eig.eigenvalues.map(|v| v.max(0.0));
    recompose(&eig.eigenvectors, &clamped)
}

/// `m^{-1/2}` for a symmetric positive definite matrix.
pub fn inverse_sqrt_spd(m: &DMatrix<f64>) -> EstimateResult<DMatrix<f64>> {
    let eig = symmetrize(m).symmetric_eigen();
    let max = eig.eigenvalues.iter().copied().fold(0.0, f64::max);
    if let Some(min) = eig.eigenvalues.iter().copied().reduce(f64::min) {
        if !(min.is_finite() && min > MIN_RELATIVE_EIGEN * max.max(1.0)) {
            return Err(EstimateError::EstimatorFailure(format!(
                "matrix is not positive definite (min eigenvalue {min})"
            )));
        }
    }
    let inv_sqrt = eig.eigenvalues.map(|v| 1.0 / v.sqrt());
    Ok(recompose(&eig.eigenvectors, &inv_sqrt))
}

fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

fn recompose(vectors: &DMatrix<f64>, values: &DVector<f64>) -> DMatrix<f64> {
    vectors * DMatrix::from_diagonal(values) * vectors.transpose()
}
