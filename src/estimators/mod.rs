//! Private estimation primitives.
//!
//! The regression estimator only depends on the two traits defined here; the
//! CoinPress implementations are the defaults wired in by the pipeline.

pub mod covariance;
pub mod mean;

pub use covariance::*;
pub use mean::*;
