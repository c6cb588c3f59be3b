//! Synthetic regression data with a Gaussian design.
//!
//! `x_i ~ N(0, diag(variances))`, `y_i = x_iᵀ β + N(0, noise_sd²)`.
//! Everything is drawn from a caller-supplied RNG so runs are reproducible.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::domain::RegressionData;
use crate::error::{EstimateError, EstimateResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDesign {
    pub n: usize,
    pub beta: Vec<f64>,
    /// Per-coordinate predictor variances (the diagonal of `Σ`).
    pub variances: Vec<f64>,
    pub noise_sd: f64,
}

impl SyntheticDesign {
    /// Isotropic design (`Σ = I`, unit noise) with `β` spread evenly so that `‖β‖ = beta_norm`.
    pub fn isotropic(n: usize, d: usize, beta_norm: f64) -> Self {
        let coord = if d == 0 { 0.0 } else { beta_norm / (d as f64).sqrt() };
        Self {
            n,
            beta: vec![coord; d],
            variances: vec![1.0; d],
            noise_sd: 1.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.beta.len()
    }

    fn validate(&self) -> EstimateResult<()> {
        if self.n == 0 {
            return Err(EstimateError::invalid("sample count must be > 0"));
        }
        if self.beta.is_empty() {
            return Err(EstimateError::invalid("dimension must be > 0"));
        }
        if self.variances.len() != self.beta.len() {
            return Err(EstimateError::DimensionMismatch {
                what: "design variances",
                expected: self.beta.len(),
                found: self.variances.len(),
            });
        }
        if self.beta.iter().any(|b| !b.is_finite()) {
            return Err(EstimateError::invalid("true beta must be finite"));
        }
        if self.variances.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(EstimateError::invalid("design variances must be finite and > 0"));
        }
        if !(self.noise_sd.is_finite() && self.noise_sd >= 0.0) {
            return Err(EstimateError::invalid("noise sd must be finite and >= 0"));
        }
        Ok(())
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> EstimateResult<RegressionData> {
        self.validate()?;
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| EstimateError::invalid(format!("design distribution error: {e}")))?;
        let sds: Vec<f64> = self.variances.iter().map(|v| v.sqrt()).collect();

        let mut x = Vec::with_capacity(self.n);
        let mut y = Vec::with_capacity(self.n);
        for _ in 0..self.n {
            let row: Vec<f64> = sds.iter().map(|sd| sd * standard.sample(rng)).collect();
            let signal: f64 = row.iter().zip(&self.beta).map(|(a, b)| a * b).sum();
            y.push(signal + self.noise_sd * standard.sample(rng));
            x.push(row);
        }
        Ok(RegressionData { x, y })
    }
}

/// Deterministic per-trial seed derived from a base seed.
pub fn trial_seed(base: u64, trial: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    base.hash(&mut hasher);
    trial.hash(&mut hasher);
    hasher.finish()
}
