//! Privacy budget accounting (zero-concentrated DP, parameter `ρ`).
//!
//! - `PrivacyBudget`: a validated positive `ρ`
//! - `BudgetSchedule`: an ordered split of a budget into stages
//! - `BudgetLedger`: consumption bookkeeping that refuses overspend

pub mod ledger;
pub mod schedule;

pub use ledger::*;
pub use schedule::*;
