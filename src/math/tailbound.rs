//! High-probability norm bound for a standard Gaussian vector.
//!
//! For `g ~ N(0, I_d)`, `‖g‖₂ ≤ sqrt(d + 2 sqrt(d ln(1/b)) + 2 ln(1/b))` with
//! probability at least `1 - b` (Laurent–Massart).

/// Failure probability used when sizing the mean estimator's clipping ball.
pub const MEAN_TAIL_PROB: f64 = 0.01;

/// Failure probability used when clipping whitened points for covariance.
pub const COV_TAIL_PROB: f64 = 0.1;

pub fn gaussian_tailbound(d: usize, b: f64) -> f64 {
    let d = d as f64;
    let log_inv = (1.0 / b).ln();
    (d + 2.0 * (d * log_inv).sqrt() + 2.0 * log_inv).sqrt()
}
