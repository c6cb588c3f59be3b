//! Reporting utilities: formatted terminal output for estimates and trials.

pub mod format;

pub use format::*;
