//! Shared estimation workflow used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load or generate data -> private estimate -> error against the truth -> run record
//!
//! The command handlers can then focus on presentation and exports.

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::SyntheticDesign;
use crate::domain::{DatasetFile, EstimatorConfig, RegressionData, RunRecord, TrialSummary};
use crate::error::AppError;
use crate::fit::{PrivateLinearRegressionEstimator, run_trials};
use crate::math::l2_distance;

/// Outputs of a synthetic run: the record plus the data it was computed from.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub record: RunRecord,
    pub dataset: DatasetFile,
}

/// Estimate `β` for a dataset whose reference `β` is public.
///
/// `truth` is recorded (with the L2 error) only when the data are known to be synthetic.
pub fn run_estimate(
    data: &RegressionData,
    beta: &[f64],
    truth: Option<Vec<f64>>,
    config: &EstimatorConfig,
    rho: f64,
    seed: u64,
) -> Result<RunRecord, AppError> {
    let estimator = PrivateLinearRegressionEstimator::coinpress(config.clone());
    let mut rng = StdRng::seed_from_u64(seed);
    let estimate = estimator.estimate(&data.x, &data.y, beta, rho, &mut rng)?;
    let l2_error = truth.as_deref().map(|t| l2_distance(&estimate.beta_hat, t));

    Ok(RunRecord {
        tool: "dplr".to_string(),
        generated_at: Utc::now(),
        seed,
        config: config.clone(),
        estimate,
        truth,
        l2_error,
    })
}

/// Generate one synthetic dataset and estimate `β` on it.
///
/// Data and noise come from the same seeded stream, so a seed pins the whole run.
pub fn run_simulate(
    design: &SyntheticDesign,
    config: &EstimatorConfig,
    rho: f64,
    seed: u64,
) -> Result<SimulationOutput, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = design.generate(&mut rng)?;
    let estimator = PrivateLinearRegressionEstimator::coinpress(config.clone());
    let estimate = estimator.estimate(&data.x, &data.y, &design.beta, rho, &mut rng)?;
    let l2_error = Some(l2_distance(&estimate.beta_hat, &design.beta));

    let record = RunRecord {
        tool: "dplr".to_string(),
        generated_at: Utc::now(),
        seed,
        config: config.clone(),
        estimate,
        truth: Some(design.beta.clone()),
        l2_error,
    };
    let dataset = DatasetFile {
        x: data.x,
        y: data.y,
        beta: design.beta.clone(),
    };
    Ok(SimulationOutput { record, dataset })
}

/// Run independent synthetic trials in parallel.
pub fn run_trial_batch(
    design: &SyntheticDesign,
    config: &EstimatorConfig,
    rho: f64,
    trials: usize,
    seed: u64,
) -> Result<TrialSummary, AppError> {
    let estimator = PrivateLinearRegressionEstimator::coinpress(config.clone());
    Ok(run_trials(&estimator, design, rho, trials, seed)?)
}
