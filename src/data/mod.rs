//! Input data: synthetic designs for experiments.

pub mod sample;

pub use sample::*;
