//! Repeated independent trials on synthetic data.
//!
//! Each trial draws a fresh dataset and a fresh private release from its own
//! seeded RNG, so trials are independent and can run in parallel. Results are
//! collected in trial order, which keeps the summary deterministic for a given
//! base seed regardless of scheduling.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::data::{SyntheticDesign, trial_seed};
use crate::domain::TrialSummary;
use crate::error::{EstimateError, EstimateResult};
use crate::estimators::{CovarianceEstimator, MultivariateMeanEstimator};
use crate::fit::linreg::PrivateLinearRegressionEstimator;
use crate::math::l2_distance;

/// Run `trials` independent estimates and summarize the L2 error against the true `β`.
///
/// The design's true `β` doubles as the public reference for normalization.
/// Configuration errors abort the whole run; estimator failures are counted.
pub fn run_trials<M, C>(
    estimator: &PrivateLinearRegressionEstimator<M, C>,
    design: &SyntheticDesign,
    rho: f64,
    trials: usize,
    seed: u64,
) -> EstimateResult<TrialSummary>
where
    M: MultivariateMeanEstimator + Sync,
    C: CovarianceEstimator + Sync,
{
    if trials == 0 {
        return Err(EstimateError::invalid("trial count must be > 0"));
    }

    let outcomes: Vec<EstimateResult<f64>> = (0..trials)
        .into_par_iter()
        .map(|trial| {
            let mut rng = StdRng::seed_from_u64(trial_seed(seed, trial));
            let data = design.generate(&mut rng)?;
            let estimate = estimator.estimate(&data.x, &data.y, &design.beta, rho, &mut rng)?;
            Ok(l2_distance(&estimate.beta_hat, &design.beta))
        })
        .collect();

    let mut errors = Vec::with_capacity(trials);
    let mut failures = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(err) => errors.push(err),
            Err(EstimateError::EstimatorFailure(reason)) => {
                warn!(%reason, "trial failed");
                failures += 1;
            }
            Err(other) => return Err(other),
        }
    }
    if errors.is_empty() {
        return Err(EstimateError::EstimatorFailure(format!(
            "all {trials} trials failed"
        )));
    }

    let summary = summarize(errors, failures);
    info!(
        trials,
        failures,
        mean_error = summary.mean_error,
        median_error = summary.median_error,
        "trials complete"
    );
    Ok(summary)
}

fn summarize(errors: Vec<f64>, failures: usize) -> TrialSummary {
    let mut sorted = errors.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let mean_error = sorted.iter().sum::<f64>() / n as f64;
    let median_error = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    };
    // Nearest-rank percentile.
    let p90_idx = ((0.9 * n as f64).ceil() as usize).clamp(1, n) - 1;

    TrialSummary {
        trials: n + failures,
        failures,
        mean_error,
        median_error,
        p90_error: sorted[p90_idx],
        errors,
    }
}
