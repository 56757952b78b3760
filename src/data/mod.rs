//! Remote data access.
//!
//! - sky-position cone search against the photometric catalog (`catalog`)

pub mod catalog;

pub use catalog::*;
