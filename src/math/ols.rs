//! Least-squares solve for the final regression step.
//!
//! With `E[x y] = Σ β`, recovering `β` from a mean estimate `m` and a covariance
//! estimate `Σ̂` means solving
//!
//! ```text
//! minimize ‖Σ̂ β - m‖²
//! ```
//!
//! A noisy `Σ̂` can be badly conditioned, so we go through SVD with a ladder
//! of tolerances rather than a plain inverse.

use nalgebra::{DMatrix, DVector};

use crate::error::{EstimateError, EstimateResult};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8, 1e-6] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Solve `cov · β = rhs` for `β`.
pub fn solve_covariance_system(cov: &DMatrix<f64>, rhs: &[f64]) -> EstimateResult<Vec<f64>> {
    if !cov.is_square() || cov.nrows() != rhs.len() {
        return Err(EstimateError::DimensionMismatch {
            what: "covariance/mean dimension",
            expected: rhs.len(),
            found: cov.nrows(),
        });
    }
    let b = DVector::from_column_slice(rhs);
    solve_least_squares(cov, &b)
        .map(|x| x.iter().copied().collect())
        .ok_or_else(|| EstimateError::EstimatorFailure("covariance estimate is singular".into()))
}
