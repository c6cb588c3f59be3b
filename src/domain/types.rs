//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during estimation
//! - loaded from / exported to JSON
//! - compared across runs

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, EstimateResult};

/// Default initial center (broadcast to every coordinate).
pub const DEFAULT_CENTER: f64 = 0.0;

/// Default initial radius around the center.
pub const DEFAULT_RADIUS: f64 = 10.0;

/// Default tail probability for sizing the mean estimator's clipping balls.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.01;

/// Default upper bound on `n × d` accepted by one estimate.
pub const DEFAULT_MAX_CELLS: usize = 50_000_000;

/// Paired predictor rows and responses, held entirely in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionData {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl RegressionData {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Predictor dimension (0 for an empty dataset).
    pub fn dim(&self) -> usize {
        self.x.first().map(Vec::len).unwrap_or(0)
    }
}

/// On-disk dataset: samples plus the public reference coefficient vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub beta: Vec<f64>,
}

impl DatasetFile {
    pub fn into_parts(self) -> (RegressionData, Vec<f64>) {
        (RegressionData { x: self.x, y: self.y }, self.beta)
    }
}

/// Initial localization center, either one value for every coordinate or a full vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CenterSpec {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Default for CenterSpec {
    fn default() -> Self {
        CenterSpec::Scalar(DEFAULT_CENTER)
    }
}

impl CenterSpec {
    /// Expand to a `d`-dimensional center.
    pub fn resolve(&self, d: usize) -> EstimateResult<Vec<f64>> {
        let center = match self {
            CenterSpec::Scalar(c) => vec![*c; d],
            CenterSpec::Vector(v) if v.len() == d => v.clone(),
            CenterSpec::Vector(v) => {
                return Err(EstimateError::DimensionMismatch {
                    what: "initial center",
                    expected: d,
                    found: v.len(),
                });
            }
        };
        if center.iter().any(|c| !c.is_finite()) {
            return Err(EstimateError::invalid("initial center must be finite"));
        }
        Ok(center)
    }
}

/// CLI selector for the covariance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceKind {
    /// Predictors are isotropic (`Σ = I`); the whole budget goes to the mean.
    Identity,
    /// Estimate `Σ` privately and solve `Σ̂ β = m`.
    Estimated,
}

/// How the predictor covariance enters the final coefficient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum CovarianceModel {
    #[default]
    Identity,
    Estimated {
        /// Fraction of the total budget spent on the covariance.
        share: f64,
        /// Upper bound `u` with `Σ ⪯ u·I`.
        upper_bound: f64,
        /// Number of covariance refinement stages.
        iterations: usize,
    },
}

impl CovarianceModel {
    pub fn kind(&self) -> CovarianceKind {
        match self {
            CovarianceModel::Identity => CovarianceKind::Identity,
            CovarianceModel::Estimated { .. } => CovarianceKind::Estimated,
        }
    }
}

/// Estimator knobs that stay fixed across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Initial center for the mean estimate, in normalized `z` units.
    pub center: CenterSpec,
    /// Initial radius around `center`, in normalized `z` units.
    pub radius: f64,
    pub covariance: CovarianceModel,
    /// Probability that a mean refinement ball misses the data's concentration region.
    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,
    /// Upper bound on `n × d`.
    pub max_cells: usize,
}

fn default_failure_probability() -> f64 {
    DEFAULT_FAILURE_PROBABILITY
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            center: CenterSpec::default(),
            radius: DEFAULT_RADIUS,
            covariance: CovarianceModel::Identity,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// Output of one private regression estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionEstimate {
    pub beta_hat: Vec<f64>,
    /// Private estimate of `E[x y]`, back on the original scale.
    pub mean_estimate: Vec<f64>,
    /// Private covariance estimate (row-major), when one was computed.
    pub covariance: Option<Vec<Vec<f64>>>,
    /// Normalization constant `sqrt(2‖β‖² + 1)`.
    pub scale: f64,
    pub rho_total: f64,
    pub rho_spent: f64,
    pub mean_stages: Vec<f64>,
    pub covariance_stages: Vec<f64>,
    pub n: usize,
    pub d: usize,
}

/// Aggregate error statistics over independent trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub failures: usize,
    pub mean_error: f64,
    pub median_error: f64,
    pub p90_error: f64,
    pub errors: Vec<f64>,
}

/// A saved run (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub config: EstimatorConfig,
    pub estimate: RegressionEstimate,
    /// True coefficients, when the data were synthetic.
    pub truth: Option<Vec<f64>>,
    pub l2_error: Option<f64>,
}
