//! Mathematical utilities: vector helpers, Gaussian tail bounds, symmetric
//! matrix helpers, and least squares.

pub mod ols;
pub mod psd;
pub mod tailbound;
pub mod vector;

pub use ols::*;
pub use psd::*;
pub use tailbound::*;
pub use vector::*;
