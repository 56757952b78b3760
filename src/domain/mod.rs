//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - forward-model configuration enums (`MetallicityMode`, `DustLaw`, `SfhKind`)
//! - the versioned forward-model configuration (`SpsConfig`)
//! - observed photometry (`Observation`) and sampled parameters (`Theta`)
//! - fit outputs (`Chain`, `AgeEstimate`, `ObjectFit`)

pub mod types;

pub use types::*;
