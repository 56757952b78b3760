//! Process-level error type.
//!
//! Every fallible pipeline stage returns `AppError`, which carries the exit
//! code the binary should terminate with. Rather than spelling codes at call
//! sites, stages pick the constructor matching the failure class:
//!
//! - [`AppError::usage`] (exit 2) — bad flags, malformed tables, missing files
//! - [`AppError::data`] (exit 3) — empty slices, no usable rows, degenerate chains
//! - [`AppError::runtime`] (exit 4) — catalog requests, sampler collapse, I/O

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    /// Usage or configuration problem (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::with_code(2, message)
    }

    /// Data problem: inputs exist but are unusable (exit code 3).
    pub fn data(message: impl Into<String>) -> Self {
        Self::with_code(3, message)
    }

    /// Runtime problem: network, sampling, or I/O failure (exit code 4).
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::with_code(4, message)
    }

    fn with_code(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
