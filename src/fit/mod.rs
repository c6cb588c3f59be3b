//! Private regression orchestration.
//!
//! Responsibilities:
//!
//! - normalize products, plan the budget, and call the injected estimators (`linreg`)
//! - run independent synthetic trials in parallel (`trials`)

pub mod linreg;
pub mod trials;

pub use linreg::*;
pub use trials::*;
