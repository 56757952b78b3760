//! Plot rendering.
//!
//! - posterior corner plots from persisted chains (`corner`)

pub mod corner;

pub use corner::*;
