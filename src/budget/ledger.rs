//! Consumption bookkeeping for a single estimate.
//!
//! Every private stage is charged against the ledger *before* its randomized
//! step runs. A charge that would push spending past the total is refused and
//! nothing is recorded. Spending is accumulated front to back with no slack,
//! matching how `BudgetSchedule` closes its last stage.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::{BudgetSchedule, PrivacyBudget};
use crate::error::{EstimateError, EstimateResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLedgerSnapshot {
    pub total: f64,
    pub spent: f64,
    pub charges: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct BudgetLedger {
    total: PrivacyBudget,
    spent: f64,
    charges: Vec<f64>,
}

impl BudgetLedger {
    pub fn new(total: PrivacyBudget) -> Self {
        Self {
            total,
            spent: 0.0,
            charges: Vec::new(),
        }
    }

    pub fn total(&self) -> PrivacyBudget {
        self.total
    }

    pub fn spent(&self) -> f64 {
        self.spent
    }

    pub fn remaining(&self) -> f64 {
        (self.total.rho() - self.spent).max(0.0)
    }

    /// Record a single stage.
    pub fn charge(&mut self, rho: f64) -> EstimateResult<()> {
        if !(rho.is_finite() && rho >= 0.0) {
            return Err(EstimateError::invalid(format!(
                "stage budget must be finite and >= 0, got {rho}"
            )));
        }
        if self.spent + rho > self.total.rho() {
            return Err(EstimateError::BudgetExceeded {
                requested: rho,
                remaining: self.remaining(),
            });
        }
        self.spent += rho;
        self.charges.push(rho);
        debug!(rho, spent = self.spent, total = self.total.rho(), "privacy budget charged");
        Ok(())
    }

    /// Record every stage of a schedule, all or nothing.
    pub fn charge_schedule(&mut self, schedule: &BudgetSchedule) -> EstimateResult<()> {
        let requested = schedule.allotted();
        let projected = schedule
            .stages()
            .iter()
            .fold(self.spent, |acc, stage| acc + stage);
        if projected > self.total.rho() {
            return Err(EstimateError::BudgetExceeded {
                requested,
                remaining: self.remaining(),
            });
        }
        for &stage in schedule.stages() {
            self.charge(stage)?;
        }
        Ok(())
    }

    /// True once spending has reached the total exactly.
    pub fn is_exhausted(&self) -> bool {
        self.spent == self.total.rho()
    }

    pub fn snapshot(&self) -> BudgetLedgerSnapshot {
        BudgetLedgerSnapshot {
            total: self.total.rho(),
            spent: self.spent,
            charges: self.charges.clone(),
        }
    }
}
