//! Private linear regression via private mean estimation.
//!
//! For `y = xᵀβ + ε` with `E[x xᵀ] = Σ`, the products `z_i = x_i y_i` have mean
//! `Σ β`. We release a private estimate of that mean and undo `Σ`:
//!
//! 1. `z_i = x_i * y_i`
//! 2. rescale by `s = sqrt(2‖β_ref‖² + 1)` so that `z` is roughly unit scale
//!    (the operator norm of `Cov(z)` is at most `s²` for a Gaussian design)
//! 3. two-phase private mean of `z` with the budget split `[ρ/4, 3ρ/4]`
//! 4. scale back by `s`
//! 5. `β̂ = Σ̂⁻¹ m̂`, where `Σ̂ = I` unless the covariance is estimated privately
//!
//! The reference `β_ref` is public side information; only the data are protected.

use rand::Rng;
use tracing::{debug, info, info_span};

use crate::budget::{BudgetLedger, BudgetSchedule, PrivacyBudget, TWO_PHASE_RATIOS};
use crate::domain::{CovarianceModel, EstimatorConfig, RegressionEstimate};
use crate::error::{EstimateError, EstimateResult};
use crate::estimators::{
    CoinPressCovariance, CoinPressMean, CovarianceEstimator, MultivariateMeanEstimator,
};
use crate::math::{elementwise_products, scale_rows, solve_covariance_system, squared_norm};

/// Normalization constant `sqrt(2‖β‖² + 1)`, always `>= 1`.
pub fn regression_scale(beta: &[f64]) -> EstimateResult<f64> {
    let arg = 2.0 * squared_norm(beta) + 1.0;
    if !(arg.is_finite() && arg >= 0.0) {
        return Err(EstimateError::invalid(format!(
            "reference beta gives a non-finite normalization (2‖β‖² + 1 = {arg})"
        )));
    }
    Ok(arg.sqrt())
}

/// How one estimate's budget is divided between covariance and mean.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetPlan {
    pub mean: BudgetSchedule,
    pub covariance: Option<BudgetSchedule>,
}

/// Split `total` according to the covariance model.
///
/// With an identity covariance the mean gets everything as `[ρ/4, 3ρ/4]`.
/// Otherwise `share` of `ρ` is split evenly over the covariance stages and the
/// rest goes to the mean, again as `[1/4, 3/4]`. Stages are consumed
/// covariance first; the final mean stage closes the whole budget.
pub fn plan_budget(total: PrivacyBudget, model: &CovarianceModel) -> EstimateResult<BudgetPlan> {
    match *model {
        CovarianceModel::Identity => Ok(BudgetPlan {
            mean: total.two_phase(),
            covariance: None,
        }),
        CovarianceModel::Estimated {
            share, iterations, ..
        } => {
            if !(share.is_finite() && share > 0.0 && share < 1.0) {
                return Err(EstimateError::invalid(format!(
                    "covariance budget share must be in (0, 1), got {share}"
                )));
            }
            if iterations == 0 {
                return Err(EstimateError::invalid("covariance iterations must be >= 1"));
            }
            let rho = total.rho();
            let mut leading = vec![rho * share / iterations as f64; iterations];
            leading.push(rho * (1.0 - share) * TWO_PHASE_RATIOS[0]);
            let (covariance, mean) = total.close(leading)?.split_at(iterations)?;
            Ok(BudgetPlan {
                mean,
                covariance: Some(covariance),
            })
        }
    }
}

/// Differentially-private regression coefficient estimator.
///
/// The mean and covariance primitives are injected so they can be swapped
/// (or replaced by deterministic doubles in tests).
#[derive(Debug, Clone)]
pub struct PrivateLinearRegressionEstimator<M = CoinPressMean, C = CoinPressCovariance> {
    mean: M,
    covariance: C,
    config: EstimatorConfig,
}

impl PrivateLinearRegressionEstimator {
    /// Wire in the CoinPress primitives.
    pub fn coinpress(config: EstimatorConfig) -> Self {
        let upper_bound = match config.covariance {
            CovarianceModel::Estimated { upper_bound, .. } => upper_bound,
            CovarianceModel::Identity => 1.0,
        };
        let mean = CoinPressMean {
            tail_prob: config.failure_probability,
        };
        Self::new(mean, CoinPressCovariance::new(upper_bound), config)
    }
}

impl<M, C> PrivateLinearRegressionEstimator<M, C>
where
    M: MultivariateMeanEstimator,
    C: CovarianceEstimator,
{
    pub fn new(mean: M, covariance: C, config: EstimatorConfig) -> Self {
        Self {
            mean,
            covariance,
            config,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate `β` from `(x, y)` spending exactly `total_budget`.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        beta: &[f64],
        total_budget: f64,
        rng: &mut R,
    ) -> EstimateResult<RegressionEstimate> {
        let total = PrivacyBudget::new(total_budget)?;
        if !(self.config.radius.is_finite() && self.config.radius > 0.0) {
            return Err(EstimateError::invalid(format!(
                "initial radius must be finite and > 0, got {}",
                self.config.radius
            )));
        }

        let n = x.len();
        let d = x.first().map(Vec::len).unwrap_or(0);
        let _span = info_span!("linreg_estimate", n, d, rho = total_budget).entered();

        // Checked before `z` is materialized.
        if n.saturating_mul(d) > self.config.max_cells {
            return Err(EstimateError::invalid(format!(
                "dataset of {n}×{d} exceeds the limit of {} cells",
                self.config.max_cells
            )));
        }

        let mut z = elementwise_products(x, y)?;
        if beta.len() != d {
            return Err(EstimateError::DimensionMismatch {
                what: "reference beta",
                expected: d,
                found: beta.len(),
            });
        }

        let scale = regression_scale(beta)?;
        scale_rows(&mut z, 1.0 / scale);
        debug!(scale, "normalized products");

        let plan = plan_budget(total, &self.config.covariance)?;
        let center = self.config.center.resolve(d)?;
        let mut ledger = BudgetLedger::new(total);

        let covariance = match &plan.covariance {
            None => None,
            Some(schedule) => {
                ledger.charge_schedule(schedule)?;
                Some(self.covariance.estimate(x, schedule, rng)?)
            }
        };

        ledger.charge_schedule(&plan.mean)?;
        let mut mean_estimate =
            self.mean
                .estimate(&z, &center, self.config.radius, &plan.mean, rng)?;
        if mean_estimate.len() != d {
            return Err(EstimateError::DimensionMismatch {
                what: "mean estimate",
                expected: d,
                found: mean_estimate.len(),
            });
        }
        mean_estimate.iter_mut().for_each(|m| *m *= scale);

        let (beta_hat, covariance) = match covariance {
            None => (mean_estimate.clone(), None),
            Some(cov) => {
                let beta_hat = solve_covariance_system(&cov, &mean_estimate)?;
                let rows: Vec<Vec<f64>> = cov
                    .row_iter()
                    .map(|r| r.iter().copied().collect())
                    .collect();
                (beta_hat, Some(rows))
            }
        };

        if !ledger.is_exhausted() {
            return Err(EstimateError::EstimatorFailure(format!(
                "budget plan left {} of {} unspent",
                ledger.remaining(),
                total_budget
            )));
        }
        info!(rho_spent = ledger.spent(), "private regression estimate released");

        Ok(RegressionEstimate {
            beta_hat,
            mean_estimate,
            covariance,
            scale,
            rho_total: total_budget,
            rho_spent: ledger.spent(),
            mean_stages: plan.mean.stages().to_vec(),
            covariance_stages: plan
                .covariance
                .as_ref()
                .map(|s| s.stages().to_vec())
                .unwrap_or_default(),
            n,
            d,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use nalgebra::DMatrix;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::CenterSpec;
    use crate::math::column_mean;

    /// Returns the exact mean and records what it was asked to do.
    #[derive(Default)]
    struct ExactMean {
        seen: RefCell<Vec<(Vec<Vec<f64>>, Vec<f64>)>>,
    }

    impl MultivariateMeanEstimator for ExactMean {
        fn estimate<R: Rng + ?Sized>(
            &self,
            data: &[Vec<f64>],
            _center: &[f64],
            _radius: f64,
            rho: &BudgetSchedule,
            _rng: &mut R,
        ) -> EstimateResult<Vec<f64>> {
            self.seen
                .borrow_mut()
                .push((data.to_vec(), rho.stages().to_vec()));
            Ok(column_mean(data))
        }
    }

    struct FailingMean;

    impl MultivariateMeanEstimator for FailingMean {
        fn estimate<R: Rng + ?Sized>(
            &self,
            _data: &[Vec<f64>],
            _center: &[f64],
            _radius: f64,
            _rho: &BudgetSchedule,
            _rng: &mut R,
        ) -> EstimateResult<Vec<f64>> {
            Err(EstimateError::EstimatorFailure("mechanism unavailable".into()))
        }
    }

    struct FixedCovariance(DMatrix<f64>);

    impl CovarianceEstimator for FixedCovariance {
        fn estimate<R: Rng + ?Sized>(
            &self,
            _data: &[Vec<f64>],
            _rho: &BudgetSchedule,
            _rng: &mut R,
        ) -> EstimateResult<DMatrix<f64>> {
            Ok(self.0.clone())
        }
    }

    fn exact_estimator() -> PrivateLinearRegressionEstimator<ExactMean, FixedCovariance> {
        PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(DMatrix::identity(1, 1)),
            EstimatorConfig::default(),
        )
    }

    #[test]
    fn worked_example_with_zero_reference_beta() {
        let est = exact_estimator();
        let x = vec![vec![1.0], vec![2.0]];
        let y = [3.0, 4.0];
        let mut rng = StdRng::seed_from_u64(0);

        let out = est.estimate(&x, &y, &[0.0], 1.0, &mut rng).unwrap();

        let seen = est.mean.seen.borrow();
        assert_eq!(seen[0].0, vec![vec![3.0], vec![8.0]]);
        assert_eq!(seen[0].1, vec![0.25, 0.75]);
        assert_eq!(out.scale, 1.0);
        assert_eq!(out.beta_hat, vec![5.5]);
        assert_eq!(out.mean_stages, vec![0.25, 0.75]);
        assert_eq!(out.rho_spent, 1.0);
        assert!(out.covariance.is_none());
    }

    #[test]
    fn rescaling_round_trips_with_identity_mean() {
        let est = PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(DMatrix::identity(2, 2)),
            EstimatorConfig::default(),
        );
        let x = vec![vec![1.0, -1.0], vec![0.5, 2.0], vec![-3.0, 0.25]];
        let y = [2.0, -1.0, 4.0];
        let beta = [3.0, 4.0];
        let mut rng = StdRng::seed_from_u64(0);

        let out = est.estimate(&x, &y, &beta, 2.0, &mut rng).unwrap();
        assert!((out.scale - 51.0_f64.sqrt()).abs() < 1e-12);

        let raw = column_mean(&elementwise_products(&x, &y).unwrap());
        for (a, b) in out.beta_hat.iter().zip(&raw) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
        let normalized = &est.mean.seen.borrow()[0].0;
        assert!((normalized[0][0] - 2.0 / out.scale).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_fail_before_any_release() {
        let est = exact_estimator();
        let mut rng = StdRng::seed_from_u64(0);
        let err = est
            .estimate(&[vec![1.0], vec![2.0]], &[1.0], &[0.0], 1.0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, EstimateError::DimensionMismatch { .. }));
        assert!(est.mean.seen.borrow().is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let est = exact_estimator();
        let x = vec![vec![1.0]];
        let mut rng = StdRng::seed_from_u64(0);

        for rho in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                est.estimate(&x, &[1.0], &[0.0], rho, &mut rng),
                Err(EstimateError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            est.estimate(&x, &[1.0], &[f64::INFINITY], 1.0, &mut rng),
            Err(EstimateError::InvalidParameter(_))
        ));
        assert!(matches!(
            est.estimate(&x, &[1.0], &[0.0, 1.0], 1.0, &mut rng),
            Err(EstimateError::DimensionMismatch { .. })
        ));

        let bad_radius = PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(DMatrix::identity(1, 1)),
            EstimatorConfig {
                radius: 0.0,
                ..EstimatorConfig::default()
            },
        );
        assert!(matches!(
            bad_radius.estimate(&x, &[1.0], &[0.0], 1.0, &mut rng),
            Err(EstimateError::InvalidParameter(_))
        ));
    }

    #[test]
    fn estimator_failure_propagates_unchanged() {
        let est = PrivateLinearRegressionEstimator::new(
            FailingMean,
            FixedCovariance(DMatrix::identity(1, 1)),
            EstimatorConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let err = est
            .estimate(&[vec![1.0]], &[1.0], &[0.0], 1.0, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            EstimateError::EstimatorFailure("mechanism unavailable".into())
        );
    }

    #[test]
    fn estimated_covariance_is_inverted() {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let est = PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(cov),
            EstimatorConfig {
                covariance: CovarianceModel::Estimated {
                    share: 0.5,
                    upper_bound: 4.0,
                    iterations: 2,
                },
                center: CenterSpec::Vector(vec![0.0, 0.0]),
                ..EstimatorConfig::default()
            },
        );
        let x = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let y = [2.0, 2.0];
        let mut rng = StdRng::seed_from_u64(0);

        let out = est.estimate(&x, &y, &[0.0, 0.0], 1.0, &mut rng).unwrap();
        assert!((out.beta_hat[0] - 1.0).abs() < 1e-12);
        assert!((out.beta_hat[1] - 0.5).abs() < 1e-12);
        assert_eq!(out.mean_stages, vec![0.125, 0.375]);
        assert_eq!(out.covariance_stages, vec![0.25, 0.25]);
        assert_eq!(out.rho_spent, 1.0);
    }

    #[test]
    fn scale_is_at_least_one() {
        for beta in [vec![], vec![0.0], vec![1e-9, -1e-9], vec![100.0, -3.0]] {
            assert!(regression_scale(&beta).unwrap() >= 1.0);
        }
        assert!(regression_scale(&[f64::NAN]).is_err());
    }

    #[test]
    fn plan_rejects_bad_share() {
        let total = PrivacyBudget::new(1.0).unwrap();
        for share in [0.0, 1.0, -0.5, f64::NAN] {
            let model = CovarianceModel::Estimated {
                share,
                upper_bound: 2.0,
                iterations: 2,
            };
            assert!(plan_budget(total, &model).is_err());
        }
    }

    #[test]
    fn overflowing_product_is_rejected_before_any_release() {
        let est = exact_estimator();
        let mut x: Vec<Vec<f64>> = (0..1_000).map(|i| vec![(i % 7) as f64 - 3.0]).collect();
        let mut y: Vec<f64> = (0..1_000).map(|i| (i % 5) as f64).collect();
        x.push(vec![1e200]);
        y.push(1e200);
        let mut rng = StdRng::seed_from_u64(0);

        let err = est.estimate(&x, &y, &[0.0], 1.0, &mut rng).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidParameter(_)), "{err:?}");
        assert!(est.mean.seen.borrow().is_empty());

        let err = est
            .estimate(&[vec![f64::NAN]], &[1.0], &[0.0], 1.0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, EstimateError::InvalidParameter(_)));
    }

    #[test]
    fn large_finite_product_stays_finite_through_coinpress() {
        let est = PrivateLinearRegressionEstimator::coinpress(EstimatorConfig::default());
        let mut x: Vec<Vec<f64>> = (0..1_000).map(|i| vec![(i % 7) as f64 - 3.0]).collect();
        let mut y: Vec<f64> = (0..1_000).map(|i| (i % 3) as f64 - 1.0).collect();
        x.push(vec![1e80]);
        y.push(1e80);
        let mut rng = StdRng::seed_from_u64(4);

        let out = est.estimate(&x, &y, &[0.0], 1.0, &mut rng).unwrap();
        assert!(out.beta_hat[0].is_finite());
        assert!(out.beta_hat[0].abs() < 1.0, "{:?}", out.beta_hat);
    }

    #[test]
    fn cell_limit_is_checked_before_products() {
        let est = PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(DMatrix::identity(2, 2)),
            EstimatorConfig {
                max_cells: 5,
                ..EstimatorConfig::default()
            },
        );
        let x = vec![vec![1.0, 2.0]; 3];
        let mut rng = StdRng::seed_from_u64(0);
        // y is short as well; the size limit must win.
        let err = est.estimate(&x, &[1.0], &[0.0, 0.0], 1.0, &mut rng).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidParameter(ref m) if m.contains("cells")));
        assert!(est.mean.seen.borrow().is_empty());
    }

    #[test]
    fn estimated_plan_spends_exactly_over_a_sweep() {
        let model = CovarianceModel::Estimated {
            share: 0.3,
            upper_bound: 4.0,
            iterations: 3,
        };
        let rhos = (1..=2_000)
            .map(|i| i as f64 * 0.001_875 + 0.000_5)
            .chain([0.3755, 1.0, 7.0, 1e-6, 1e6]);
        for rho in rhos {
            let total = PrivacyBudget::new(rho).unwrap();
            let plan = plan_budget(total, &model).unwrap();
            let covariance = plan.covariance.unwrap();
            assert_eq!(covariance.len(), 3);
            assert_eq!(plan.mean.len(), 2);

            let mut ledger = BudgetLedger::new(total);
            ledger.charge_schedule(&covariance).unwrap();
            ledger.charge_schedule(&plan.mean).unwrap();
            assert_eq!(ledger.spent(), rho, "rho={rho}");
            assert!(ledger.is_exhausted());
        }
    }

    #[test]
    fn estimated_mode_reports_exact_spend() {
        let est = PrivateLinearRegressionEstimator::new(
            ExactMean::default(),
            FixedCovariance(DMatrix::identity(1, 1)),
            EstimatorConfig {
                covariance: CovarianceModel::Estimated {
                    share: 0.3,
                    upper_bound: 4.0,
                    iterations: 3,
                },
                ..EstimatorConfig::default()
            },
        );
        let x = vec![vec![1.0], vec![2.0]];
        let mut rng = StdRng::seed_from_u64(0);
        for rho in [0.3755, 0.1, 0.7, 1.3, 2.9] {
            let out = est.estimate(&x, &[3.0, 4.0], &[0.0], rho, &mut rng).unwrap();
            assert_eq!(out.rho_spent, rho);
        }
    }

    #[test]
    fn coinpress_uses_configured_failure_probability() {
        let est = PrivateLinearRegressionEstimator::coinpress(EstimatorConfig {
            failure_probability: 0.05,
            ..EstimatorConfig::default()
        });
        assert_eq!(est.mean.tail_prob, 0.05);
    }

    #[test]
    fn coinpress_recovers_beta_on_gaussian_design() {
        use crate::data::SyntheticDesign;
        use crate::math::l2_distance;

        let design = SyntheticDesign::isotropic(20_000, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let data = design.generate(&mut rng).unwrap();
        let est = PrivateLinearRegressionEstimator::coinpress(EstimatorConfig::default());

        let out = est
            .estimate(&data.x, &data.y, &design.beta, 5.0, &mut rng)
            .unwrap();
        let err = l2_distance(&out.beta_hat, &design.beta);
        assert!(err < 0.1, "error {err}, beta_hat {:?}", out.beta_hat);
        assert_eq!(out.rho_spent, 5.0);
    }

    #[test]
    fn coinpress_with_estimated_covariance_tracks_anisotropic_design() {
        use crate::data::SyntheticDesign;
        use crate::math::l2_distance;

        let design = SyntheticDesign {
            n: 20_000,
            beta: vec![1.0, 0.5],
            variances: vec![1.0, 2.0],
            noise_sd: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(23);
        let data = design.generate(&mut rng).unwrap();
        let est = PrivateLinearRegressionEstimator::coinpress(EstimatorConfig {
            covariance: CovarianceModel::Estimated {
                share: 0.5,
                upper_bound: 4.0,
                iterations: 3,
            },
            ..EstimatorConfig::default()
        });

        let out = est
            .estimate(&data.x, &data.y, &design.beta, 20.0, &mut rng)
            .unwrap();
        let err = l2_distance(&out.beta_hat, &design.beta);
        assert!(err < 0.3, "error {err}, beta_hat {:?}", out.beta_hat);
        assert!(out.covariance.is_some());
    }
}
