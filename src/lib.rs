//! `dp-linreg` library crate.
//!
//! The binary (`dplr`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the estimators can be reused with other mean/covariance primitives
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod budget;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod estimators;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
