//! Command-line parsing for the private regression harness.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimation code. Every estimator knob also reads a
//! `DPLR_*` environment variable (a `.env` file is loaded first), so defaults
//! can be pinned per workspace.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    CenterSpec, CovarianceKind, CovarianceModel, DEFAULT_FAILURE_PROBABILITY, DEFAULT_MAX_CELLS,
    DEFAULT_RADIUS, EstimatorConfig,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dplr", version, about = "Differentially-private linear regression")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate beta from a dataset JSON file (`{"x": [[..]], "y": [..], "beta": [..]}`).
    Estimate(EstimateArgs),
    /// Generate a synthetic Gaussian design and estimate beta once.
    Simulate(SimulateArgs),
    /// Run independent synthetic trials in parallel and summarize the error.
    Trials(TrialsArgs),
    /// Print a previously exported run record.
    Show(ShowArgs),
}

/// Estimator options shared by every estimating command.
#[derive(Debug, Args, Clone)]
pub struct EstimatorArgs {
    /// Total zCDP privacy budget (rho).
    #[arg(long, env = "DPLR_RHO", default_value_t = 1.0)]
    pub rho: f64,

    /// Initial center for the mean estimate (normalized units, broadcast to every coordinate).
    #[arg(long, env = "DPLR_CENTER", default_value_t = 0.0, allow_negative_numbers = true)]
    pub center: f64,

    /// Initial radius around the center (normalized units).
    #[arg(long, env = "DPLR_RADIUS", default_value_t = DEFAULT_RADIUS)]
    pub radius: f64,

    /// How the predictor covariance is handled.
    #[arg(long, env = "DPLR_COVARIANCE", value_enum, default_value_t = CovarianceKind::Identity)]
    pub covariance: CovarianceKind,

    /// Fraction of the budget spent on the covariance (with `--covariance estimated`).
    #[arg(long, env = "DPLR_COV_SHARE", default_value_t = 0.5)]
    pub cov_share: f64,

    /// Upper bound u with Σ ⪯ u·I (with `--covariance estimated`).
    #[arg(long, env = "DPLR_COV_UPPER_BOUND", default_value_t = 4.0)]
    pub cov_upper_bound: f64,

    /// Covariance refinement stages (with `--covariance estimated`).
    #[arg(long, env = "DPLR_COV_ITERATIONS", default_value_t = 3)]
    pub cov_iterations: usize,

    /// Tail probability used to size the mean estimator's clipping balls.
    #[arg(long, env = "DPLR_FAILURE_PROBABILITY", default_value_t = DEFAULT_FAILURE_PROBABILITY)]
    pub failure_probability: f64,

    /// Largest accepted n × d.
    #[arg(long, env = "DPLR_MAX_CELLS", default_value_t = DEFAULT_MAX_CELLS)]
    pub max_cells: usize,

    /// Random seed for the private release (and synthetic data).
    #[arg(long, env = "DPLR_SEED", default_value_t = 42)]
    pub seed: u64,
}

impl EstimatorArgs {
    pub fn estimator_config(&self) -> EstimatorConfig {
        let covariance = match self.covariance {
            CovarianceKind::Identity => CovarianceModel::Identity,
            CovarianceKind::Estimated => CovarianceModel::Estimated {
                share: self.cov_share,
                upper_bound: self.cov_upper_bound,
                iterations: self.cov_iterations,
            },
        };
        EstimatorConfig {
            center: CenterSpec::Scalar(self.center),
            radius: self.radius,
            covariance,
            failure_probability: self.failure_probability,
            max_cells: self.max_cells,
        }
    }
}

/// Synthetic design options.
#[derive(Debug, Args, Clone)]
pub struct DesignArgs {
    /// Number of samples.
    #[arg(short = 'n', long = "n", default_value_t = 10_000)]
    pub samples: usize,

    /// Predictor dimension.
    #[arg(short = 'd', long = "d", default_value_t = 2)]
    pub dim: usize,

    /// Norm of the true beta (spread evenly across coordinates).
    #[arg(long, default_value_t = 1.0)]
    pub beta_norm: f64,

    /// Standard deviation of the response noise.
    #[arg(long, default_value_t = 1.0)]
    pub noise_sd: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct EstimateArgs {
    /// Dataset JSON file.
    #[arg(long, value_name = "JSON")]
    pub input: PathBuf,

    #[command(flatten)]
    pub estimator: EstimatorArgs,

    /// Export the run record to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub design: DesignArgs,

    #[command(flatten)]
    pub estimator: EstimatorArgs,

    /// Export the run record to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Also write the generated dataset to JSON.
    #[arg(long = "export-data")]
    pub export_data: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct TrialsArgs {
    #[command(flatten)]
    pub design: DesignArgs,

    #[command(flatten)]
    pub estimator: EstimatorArgs,

    /// Number of independent trials.
    #[arg(short = 't', long, default_value_t = 50)]
    pub trials: usize,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Run record JSON produced by `--export`.
    #[arg(long, value_name = "JSON")]
    pub run: PathBuf,
}
