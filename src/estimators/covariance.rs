//! Iterative private covariance estimation (CoinPress).
//!
//! Assumes centered data with `I ⪯ Σ ⪯ u·I`. Each stage whitens the data with
//! the current preconditioner `A`, clips whitened points to a Gaussian norm
//! bound, releases their second moment with symmetric Gaussian noise, and
//! tightens `A` so that `Aᵀ Σ A` approaches the identity. The last stage's
//! release is mapped back through the preconditioner it was computed under.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::budget::BudgetSchedule;
use crate::error::{EstimateError, EstimateResult};
use crate::math::{
    COV_TAIL_PROB, ensure_finite_rows, gaussian_tailbound, inverse_sqrt_spd, project_psd,
    row_dimension,
};

pub trait CovarianceEstimator {
    fn estimate<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        rho: &BudgetSchedule,
        rng: &mut R,
    ) -> EstimateResult<DMatrix<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinPressCovariance {
    /// Upper bound `u` on the largest eigenvalue of the covariance.
    pub upper_bound: f64,
    pub tail_prob: f64,
}

impl CoinPressCovariance {
    pub fn new(upper_bound: f64) -> Self {
        Self {
            upper_bound,
            tail_prob: COV_TAIL_PROB,
        }
    }

    /// One stage: returns the tightened preconditioner and the noisy whitened second moment.
    fn step<R: Rng + ?Sized>(
        &self,
        x: &DMatrix<f64>,
        a: &DMatrix<f64>,
        rho: f64,
        rng: &mut R,
    ) -> EstimateResult<(DMatrix<f64>, DMatrix<f64>)> {
        let n = x.nrows() as f64;
        let d = x.ncols();
        let gamma = gaussian_tailbound(d, self.tail_prob);
        let ratio = d as f64 / n;
        let eta = 0.5 * (2.0 * ratio.sqrt() + ratio);

        let mut w = x * a;
        if w.iter().any(|v| !v.is_finite()) {
            return Err(EstimateError::EstimatorFailure(
                "whitened data overflowed".into(),
            ));
        }
        let mut clipped = 0usize;
        for mut row in w.row_iter_mut() {
            // Norm taken on the max-abs scaled row so huge entries do not overflow.
            let amax = row.amax();
            if amax == 0.0 {
                continue;
            }
            let unit_norm = row.unscale(amax).norm();
            if amax > gamma / unit_norm {
                row /= amax;
                row *= gamma / unit_norm;
                clipped += 1;
            }
        }

        let sd = gamma * gamma / (n * rho.sqrt());
        let noise = Normal::new(0.0, sd)
            .map_err(|e| EstimateError::EstimatorFailure(format!("noise distribution error: {e}")))?;
        let mut z = w.transpose() * &w / n;
        for i in 0..d {
            for j in i..d {
                let e = noise.sample(rng);
                z[(i, j)] += e;
                if i != j {
                    z[(j, i)] += e;
                }
            }
        }
        let z = project_psd(&z);

        let u = &z + DMatrix::identity(d, d) * eta;
        let next = a * inverse_sqrt_spd(&u)?;
        debug!(rho, clipped, sd, eta, "covariance refinement stage");
        Ok((next, z))
    }
}

impl CovarianceEstimator for CoinPressCovariance {
    fn estimate<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        rho: &BudgetSchedule,
        rng: &mut R,
    ) -> EstimateResult<DMatrix<f64>> {
        let d = row_dimension(data)?;
        ensure_finite_rows(data, "covariance input")?;
        if !(self.upper_bound.is_finite() && self.upper_bound >= 1.0) {
            return Err(EstimateError::invalid(format!(
                "covariance upper bound must be finite and >= 1, got {}",
                self.upper_bound
            )));
        }
        if rho.is_empty() || rho.stages().iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(EstimateError::invalid(format!(
                "every covariance stage needs a positive budget, got {:?}",
                rho.stages()
            )));
        }
        if !(self.tail_prob > 0.0 && self.tail_prob < 1.0) {
            return Err(EstimateError::invalid("tail probability must be in (0, 1)"));
        }

        let x = DMatrix::from_fn(data.len(), d, |i, j| data[i][j]);
        let mut a = DMatrix::identity(d, d) / self.upper_bound.sqrt();
        let (last, head) = rho
            .stages()
            .split_last()
            .ok_or_else(|| EstimateError::invalid("covariance schedule is empty"))?;
        for &stage in head {
            let (next, _) = self.step(&x, &a, stage, rng)?;
            a = next;
        }
        // Z ≈ Aᵀ Σ A for the preconditioner the final stage was run with.
        let (_, z) = self.step(&x, &a, *last, rng)?;
        let a_inv = a.try_inverse().ok_or_else(|| {
            EstimateError::EstimatorFailure("covariance preconditioner is singular".into())
        })?;
        Ok(a_inv.transpose() * z * a_inv)
    }
}
