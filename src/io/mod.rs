//! Input/output helpers.
//!
//! - photometry slice ingest + validation (`photometry`)
//! - chain table read/write (`chain`)
//! - per-slice ages table export (`ages`)

pub mod ages;
pub mod chain;
pub mod photometry;

pub use ages::*;
pub use chain::*;
pub use photometry::*;
