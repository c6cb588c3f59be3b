//! Budget values and ordered splits.

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, EstimateResult};

/// Ratios for the two-phase mean estimate: a coarse localization stage
/// followed by a refinement stage that gets the larger share.
pub const TWO_PHASE_RATIOS: [f64; 2] = [0.25, 0.75];

/// How far split ratios may drift from summing to one.
const RATIO_SUM_TOL: f64 = 1e-9;

/// A positive, finite zCDP budget `ρ`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivacyBudget(f64);

impl PrivacyBudget {
    pub fn new(rho: f64) -> EstimateResult<Self> {
        if !(rho.is_finite() && rho > 0.0) {
            return Err(EstimateError::invalid(format!(
                "privacy budget must be finite and > 0, got {rho}"
            )));
        }
        Ok(Self(rho))
    }

    pub fn rho(self) -> f64 {
        self.0
    }

    /// Split into ordered stages proportional to `ratios`.
    ///
    /// The last stage takes whatever the earlier stages left, so the stages
    /// always add back up to this budget.
    pub fn split(self, ratios: &[f64]) -> EstimateResult<BudgetSchedule> {
        if ratios.is_empty() {
            return Err(EstimateError::invalid("budget split needs at least one ratio"));
        }
        if ratios.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(EstimateError::invalid(format!(
                "budget split ratios must be finite and > 0, got {ratios:?}"
            )));
        }
        let ratio_sum: f64 = ratios.iter().sum();
        if (ratio_sum - 1.0).abs() > RATIO_SUM_TOL {
            return Err(EstimateError::invalid(format!(
                "budget split ratios must sum to 1, got {ratio_sum}"
            )));
        }

        let leading = ratios[..ratios.len() - 1]
            .iter()
            .map(|ratio| self.0 * ratio)
            .collect();
        self.close(leading)
    }

    /// Append a final stage so the stages, summed front to back, equal this budget exactly.
    pub fn close(self, leading: Vec<f64>) -> EstimateResult<BudgetSchedule> {
        if leading.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(EstimateError::invalid(format!(
                "leading budget stages must be finite and > 0, got {leading:?}"
            )));
        }
        let prefix: f64 = leading.iter().sum();
        let last = closing_stage(self.0, prefix);
        if !(last > 0.0) {
            return Err(EstimateError::invalid(format!(
                "leading stages {leading:?} leave nothing of {}",
                self.0
            )));
        }
        if prefix + last != self.0 {
            return Err(EstimateError::EstimatorFailure(format!(
                "cannot close budget {} after {prefix}",
                self.0
            )));
        }

        let mut stages = leading;
        stages.push(last);
        Ok(BudgetSchedule {
            total: self,
            stages,
        })
    }

    /// The standard `[ρ/4, 3ρ/4]` split.
    pub fn two_phase(self) -> BudgetSchedule {
        let first = self.0 * TWO_PHASE_RATIOS[0];
        BudgetSchedule {
            total: self,
            stages: vec![first, closing_stage(self.0, first)],
        }
    }

    /// `iterations` equal stages.
    pub fn even(self, iterations: usize) -> EstimateResult<BudgetSchedule> {
        if iterations == 0 {
            return Err(EstimateError::invalid("iteration count must be >= 1"));
        }
        let ratios = vec![1.0 / iterations as f64; iterations];
        self.split(&ratios)
    }
}

/// An ordered sequence of stage budgets, consumed front to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSchedule {
    total: PrivacyBudget,
    stages: Vec<f64>,
}

impl BudgetSchedule {
    pub fn total(&self) -> PrivacyBudget {
        self.total
    }

    pub fn stages(&self) -> &[f64] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of the stages in consumption order.
    pub fn allotted(&self) -> f64 {
        self.stages.iter().sum()
    }

    /// Split into `stages[..mid]` and `stages[mid..]`, keeping consumption order.
    ///
    /// Each part's total is its own front-to-back sum.
    pub fn split_at(&self, mid: usize) -> EstimateResult<(BudgetSchedule, BudgetSchedule)> {
        if mid == 0 || mid >= self.stages.len() {
            return Err(EstimateError::invalid(format!(
                "cannot split {} stages at {mid}",
                self.stages.len()
            )));
        }
        let part = |stages: &[f64]| -> EstimateResult<BudgetSchedule> {
            Ok(BudgetSchedule {
                total: PrivacyBudget::new(stages.iter().sum())?,
                stages: stages.to_vec(),
            })
        };
        Ok((part(&self.stages[..mid])?, part(&self.stages[mid..])?))
    }
}

/// Remainder `r` with `prefix + r == total` in floating point.
///
/// `total - prefix` is usually exact enough; when the re-addition rounds away
/// from `total` the remainder is nudged by an ulp at a time.
fn closing_stage(total: f64, prefix: f64) -> f64 {
    let mut last = total - prefix;
    for _ in 0..8 {
        let sum = prefix + last;
        if sum == total || !(last > 0.0) {
            break;
        }
        let bits = last.to_bits();
        last = if sum < total {
            f64::from_bits(bits + 1)
        } else {
            f64::from_bits(bits - 1)
        };
    }
    last
}
