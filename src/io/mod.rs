//! Input/output helpers.
//!
//! - dataset JSON read/write (`dataset`)
//! - run record export (`export`)

pub mod dataset;
pub mod export;

pub use dataset::*;
pub use export::*;
