//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input datasets (`RegressionData`, `DatasetFile`)
//! - estimator configuration (`EstimatorConfig`, `CenterSpec`, `CovarianceModel`)
//! - estimation outputs (`RegressionEstimate`, `TrialSummary`, `RunRecord`)

pub mod types;

pub use types::*;
