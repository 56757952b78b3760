//! Reporting utilities: terminal summaries and the per-slice ages table.

pub mod format;

pub use format::*;
