//! Posterior evaluation and sampling.
//!
//! Responsibilities:
//!
//! - flat-prior log-posterior over the 7 SFH parameters (`likelihood`)
//! - affine-invariant ensemble sampling (`sampler`)
//! - derived age column + percentile estimate (`age`)

pub mod age;
pub mod likelihood;
pub mod sampler;

pub use age::*;
pub use likelihood::*;
pub use sampler::*;
