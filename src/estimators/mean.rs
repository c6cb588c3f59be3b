//! Iterative private mean estimation (CoinPress).
//!
//! Each stage starts from a ball `B(c, r)` believed to contain the mean:
//!
//! 1. clip every point into a slightly larger ball `B(c, τ)`
//! 2. release the clipped mean with Gaussian noise calibrated to `2τ/n`
//! 3. shrink the ball around the noisy mean
//!
//! Early stages localize cheaply; the last stage does the precise release.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::budget::BudgetSchedule;
use crate::error::{EstimateError, EstimateResult};
use crate::math::{
    MEAN_TAIL_PROB, clip_to_ball, ensure_finite_rows, gaussian_tailbound, row_dimension,
};

/// A differentially-private multivariate mean estimator.
///
/// Implementations must spend exactly `rho`, one stage per refinement
/// iteration, and clip using `center`/`radius` as the initial localization.
pub trait MultivariateMeanEstimator {
    fn estimate<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        center: &[f64],
        radius: f64,
        rho: &BudgetSchedule,
        rng: &mut R,
    ) -> EstimateResult<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinPressMean {
    /// Failure probability for the Gaussian norm bound used to size each ball.
    pub tail_prob: f64,
}

impl Default for CoinPressMean {
    fn default() -> Self {
        Self {
            tail_prob: MEAN_TAIL_PROB,
        }
    }
}

/// Output of one refinement stage.
#[derive(Debug, Clone)]
struct MeanStep {
    center: Vec<f64>,
    radius: f64,
}

impl CoinPressMean {
    fn step<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        center: &[f64],
        radius: f64,
        rho: f64,
        rng: &mut R,
    ) -> EstimateResult<MeanStep> {
        let n = data.len() as f64;
        let d = center.len();
        let gamma = gaussian_tailbound(d, self.tail_prob);
        let clip = (radius * radius + 6.0 * radius + gamma * gamma)
            .sqrt()
            .min(radius + gamma);

        let mut sum = vec![0.0; d];
        let mut clipped = 0usize;
        let mut point = vec![0.0; d];
        for row in data {
            point.copy_from_slice(row);
            if clip_to_ball(&mut point, center, clip) {
                clipped += 1;
            }
            for (acc, p) in sum.iter_mut().zip(&point) {
                *acc += p;
            }
        }

        let sensitivity = 2.0 * clip / n;
        let sd = sensitivity / (2.0 * rho).sqrt();
        let noise = Normal::new(0.0, sd)
            .map_err(|e| EstimateError::EstimatorFailure(format!("noise distribution error: {e}")))?;

        let center: Vec<f64> = sum.iter().map(|s| s / n + noise.sample(rng)).collect();
        let radius = (1.0 / n + sd * sd).sqrt() * gamma;
        debug!(rho, clip, clipped, sd, radius, "mean refinement stage");

        Ok(MeanStep { center, radius })
    }
}

impl MultivariateMeanEstimator for CoinPressMean {
    fn estimate<R: Rng + ?Sized>(
        &self,
        data: &[Vec<f64>],
        center: &[f64],
        radius: f64,
        rho: &BudgetSchedule,
        rng: &mut R,
    ) -> EstimateResult<Vec<f64>> {
        let d = row_dimension(data)?;
        ensure_finite_rows(data, "mean input")?;
        if center.len() != d {
            return Err(EstimateError::DimensionMismatch {
                what: "initial center",
                expected: d,
                found: center.len(),
            });
        }
        if center.iter().any(|c| !c.is_finite()) {
            return Err(EstimateError::invalid("initial center must be finite"));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(EstimateError::invalid(format!(
                "initial radius must be finite and > 0, got {radius}"
            )));
        }
        if rho.is_empty() || rho.stages().iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(EstimateError::invalid(format!(
                "every refinement stage needs a positive budget, got {:?}",
                rho.stages()
            )));
        }
        if !(self.tail_prob > 0.0 && self.tail_prob < 1.0) {
            return Err(EstimateError::invalid("tail probability must be in (0, 1)"));
        }

        let mut state = MeanStep {
            center: center.to_vec(),
            radius,
        };
        for &stage_rho in rho.stages() {
            state = self.step(data, &state.center, state.radius, stage_rho, rng)?;
        }
        Ok(state.center)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::budget::PrivacyBudget;
    use crate::math::{column_mean, l2_distance};

    fn gaussian_rows(n: usize, mean: &[f64], seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|_| mean.iter().map(|m| m + normal.sample(&mut rng)).collect())
            .collect()
    }

    #[test]
    fn huge_budget_recovers_empirical_mean() {
        let data = gaussian_rows(2_000, &[1.0, -2.0, 0.5], 7);
        let empirical = column_mean(&data);
        let rho = PrivacyBudget::new(1e12).unwrap().two_phase();
        let mut rng = StdRng::seed_from_u64(11);

        let est = CoinPressMean::default()
            .estimate(&data, &[0.0; 3], 10.0, &rho, &mut rng)
            .unwrap();
        assert!(
            l2_distance(&est, &empirical) < 5e-3,
            "estimate {est:?} vs empirical {empirical:?}"
        );
    }

    #[test]
    fn moderate_budget_lands_near_true_mean() {
        let truth = [3.0, 3.0];
        let data = gaussian_rows(20_000, &truth, 3);
        let rho = PrivacyBudget::new(1.0).unwrap().two_phase();
        let mut rng = StdRng::seed_from_u64(5);

        let est = CoinPressMean::default()
            .estimate(&data, &[0.0, 0.0], 10.0, &rho, &mut rng)
            .unwrap();
        assert!(l2_distance(&est, &truth) < 0.25, "estimate {est:?}");
    }

    #[test]
    fn same_seed_same_release() {
        let data = gaussian_rows(500, &[0.0, 0.0], 1);
        let rho = PrivacyBudget::new(0.5).unwrap().two_phase();
        let a = CoinPressMean::default()
            .estimate(&data, &[0.0, 0.0], 5.0, &rho, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = CoinPressMean::default()
            .estimate(&data, &[0.0, 0.0], 5.0, &rho, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn one_extreme_row_is_clipped_not_propagated() {
        let mut data = gaussian_rows(1_000, &[0.0], 13);
        data.push(vec![1e160]);
        let rho = PrivacyBudget::new(1.0).unwrap().two_phase();
        let mut rng = StdRng::seed_from_u64(2);

        let est = CoinPressMean::default()
            .estimate(&data, &[0.0], 10.0, &rho, &mut rng)
            .unwrap();
        assert!(est[0].is_finite());
        assert!(est[0].abs() < 0.5, "estimate {est:?}");
    }

    #[test]
    fn non_finite_rows_are_rejected() {
        let data = vec![vec![0.0], vec![f64::INFINITY]];
        let rho = PrivacyBudget::new(1.0).unwrap().two_phase();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            CoinPressMean::default().estimate(&data, &[0.0], 1.0, &rho, &mut rng),
            Err(EstimateError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_bad_localization() {
        let data = vec![vec![1.0, 2.0]];
        let rho = PrivacyBudget::new(1.0).unwrap().two_phase();
        let mut rng = StdRng::seed_from_u64(0);
        let est = CoinPressMean::default();

        assert!(matches!(
            est.estimate(&data, &[0.0], 1.0, &rho, &mut rng),
            Err(EstimateError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            est.estimate(&data, &[0.0, 0.0], 0.0, &rho, &mut rng),
            Err(EstimateError::InvalidParameter(_))
        ));
        assert!(matches!(
            est.estimate(&data, &[f64::NAN, 0.0], 1.0, &rho, &mut rng),
            Err(EstimateError::InvalidParameter(_))
        ));
    }
}
