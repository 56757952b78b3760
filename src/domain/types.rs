//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during sampling
//! - exported to TSV alongside chains
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Photometric bands, in table column order.
pub const BANDS: [&str; 5] = ["u", "g", "r", "i", "z"];

/// Number of photometric bands per observation.
pub const N_BANDS: usize = 5;

/// Number of sampled parameters.
pub const N_PARAMS: usize = 7;

/// Column labels for chain tables and corner plots, in `Theta` order, with the
/// derived age appended.
pub const CHAIN_COLUMNS: [&str; 8] = [
    "logzsol", "dust2", "tau", "tStart", "sfTrans", "sfSlope", "c", "age",
];

/// How the synthesis engine treats stellar metallicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetallicityMode {
    /// Interpolate band luminosities continuously in `logzsol`.
    Continuous,
    /// Clamp `logzsol` to the nearest tabulated metallicity.
    Nearest,
}

/// Dust attenuation law applied to the composite population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DustLaw {
    /// Power-law attenuation curve, `A(λ) ∝ λ^-0.7`.
    PowerLaw,
    /// Calzetti-like starburst curve (steeper in the blue, `λ^-1.2`).
    Calzetti,
}

/// Star-formation-history family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SfhKind {
    /// Delayed-tau: `SFR(t) ∝ (t - tStart) exp(-(t - tStart)/τ)`.
    LinExp,
    /// Delayed-tau until `sfTrans`, then a linear tail with slope `sfSlope`,
    /// truncated at zero. The late tail avoids the systematic age
    /// overestimate of the plain tau model.
    LinExpLateLinear,
}

impl std::fmt::Display for MetallicityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetallicityMode::Continuous => write!(f, "continuous"),
            MetallicityMode::Nearest => write!(f, "nearest"),
        }
    }
}

impl std::fmt::Display for DustLaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DustLaw::PowerLaw => write!(f, "power-law"),
            DustLaw::Calzetti => write!(f, "calzetti"),
        }
    }
}

impl std::fmt::Display for SfhKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SfhKind::LinExp => write!(f, "lin-exp"),
            SfhKind::LinExpLateLinear => write!(f, "lin-exp-late-linear"),
        }
    }
}

/// Versioned forward-model configuration.
///
/// Every synthesis option is explicit here; nothing relies on engine-internal
/// defaults. The version constant is written into chain headers so persisted
/// chains stay traceable to the configuration that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpsConfig {
    pub metallicity: MetallicityMode,
    pub dust_law: DustLaw,
    pub sfh: SfhKind,
    /// Add nebular line/continuum emission for young populations.
    pub neb_emission: bool,
    /// Apply intergalactic-medium absorption to the bluest band.
    pub igm_absorption: bool,
    /// Extra optical depth multiplier for stars still in their birth cloud.
    pub young_dust_factor: f64,
    /// Age (Gyr) below which the birth-cloud dust term applies.
    pub birth_cloud_age: f64,
}

/// Bumped whenever a change to `SpsConfig` or the synthesis tables would make
/// previously persisted chains incomparable.
pub const SPS_CONFIG_VERSION: u32 = 1;

impl Default for SpsConfig {
    fn default() -> Self {
        Self {
            metallicity: MetallicityMode::Continuous,
            dust_law: DustLaw::PowerLaw,
            sfh: SfhKind::LinExpLateLinear,
            neb_emission: true,
            igm_absorption: false,
            young_dust_factor: 2.0,
            birth_cloud_age: 0.01,
        }
    }
}

/// One host galaxy's observed photometry, as loaded from a slice table.
///
/// Immutable once loaded; one instance per table row.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Survey identifier of the supernova whose host this is.
    pub snid: u64,
    /// IAU designation, when the table carries one.
    pub name: Option<String>,
    pub redshift: f64,
    /// Apparent magnitudes in `BANDS` order.
    pub magnitudes: [f64; N_BANDS],
    /// 1σ magnitude uncertainties in `BANDS` order.
    pub uncertainties: [f64; N_BANDS],
}

/// One sampled parameter vector.
///
/// Field order matches `CHAIN_COLUMNS` (minus the derived age column).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theta {
    /// Log stellar metallicity relative to solar.
    pub logzsol: f64,
    /// Diffuse dust optical depth toward old stars.
    pub dust2: f64,
    /// Star-formation e-fold time (Gyr).
    pub tau: f64,
    /// Onset of star formation (Gyr after the Big Bang).
    pub t_start: f64,
    /// Transition from the delayed-tau phase to the linear tail (Gyr).
    pub sf_trans: f64,
    /// Slope of the late linear tail (relative SFR per Gyr).
    pub sf_slope: f64,
    /// Magnitude offset absorbing total stellar mass and calibration.
    pub c: f64,
}

impl Theta {
    pub fn from_array(values: [f64; N_PARAMS]) -> Self {
        Self {
            logzsol: values[0],
            dust2: values[1],
            tau: values[2],
            t_start: values[3],
            sf_trans: values[4],
            sf_slope: values[5],
            c: values[6],
        }
    }

    pub fn to_array(self) -> [f64; N_PARAMS] {
        [
            self.logzsol,
            self.dust2,
            self.tau,
            self.t_start,
            self.sf_trans,
            self.sf_slope,
            self.c,
        ]
    }
}

/// Flattened post-burn-in sampler output for one object.
///
/// Rows are appended in (step, walker) order and never mutated afterwards;
/// `ages` is the derived column computed by the age extractor.
#[derive(Debug, Clone)]
pub struct Chain {
    pub params: Vec<[f64; N_PARAMS]>,
    pub ages: Vec<f64>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Derived stellar age with percentile uncertainties (all Gyr).
///
/// `lower`/`median`/`upper` are the 16th/50th/84th percentiles of the chain's
/// age column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgeEstimate {
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
}

impl AgeEstimate {
    /// Downward uncertainty (median − 16th percentile).
    pub fn err_minus(&self) -> f64 {
        self.median - self.lower
    }

    /// Upward uncertainty (84th percentile − median).
    pub fn err_plus(&self) -> f64 {
        self.upper - self.median
    }
}

impl std::fmt::Display for AgeEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2} +{:.2}/-{:.2} Gyr",
            self.median,
            self.err_plus(),
            self.err_minus()
        )
    }
}

/// Completed fit for a single object.
#[derive(Debug, Clone)]
pub struct ObjectFit {
    pub snid: u64,
    pub redshift: f64,
    pub estimate: AgeEstimate,
    /// Mean walker acceptance fraction over the run.
    pub acceptance: f64,
    /// Retained (post-burn-in) sample count.
    pub n_samples: usize,
    /// Where the chain was persisted, if it was.
    pub chain_path: Option<PathBuf>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Job-array index; selects the input slice and the log file name.
    pub job: Option<u32>,
    /// Directory holding photometry slice tables.
    pub data_dir: PathBuf,
    /// Directory receiving chain tables and the ages table.
    pub output_dir: PathBuf,

    pub walkers: usize,
    pub steps: usize,
    pub burn_in: usize,
    /// Base RNG seed; combined with each object's SNID.
    pub seed: u64,

    /// Sharply reduced sampling, no chain persistence.
    pub debug: bool,
    /// Suppress console echo of log lines (the log file still gets them).
    pub quiet: bool,

    pub sps: SpsConfig,
}

impl RunConfig {
    /// Walker count after applying debug-mode reduction.
    pub fn effective_walkers(&self) -> usize {
        if self.debug { 16 } else { self.walkers }
    }

    /// Step count after applying debug-mode reduction.
    pub fn effective_steps(&self) -> usize {
        if self.debug { 80 } else { self.steps }
    }

    /// Burn-in after applying debug-mode reduction.
    pub fn effective_burn_in(&self) -> usize {
        if self.debug { 30 } else { self.burn_in }
    }

    /// Chains are persisted except in debug mode.
    pub fn persist_chains(&self) -> bool {
        !self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theta_array_round_trip() {
        let theta = Theta {
            logzsol: -0.3,
            dust2: 0.1,
            tau: 1.0,
            t_start: 1.5,
            sf_trans: 9.0,
            sf_slope: 0.5,
            c: -20.0,
        };
        let back = Theta::from_array(theta.to_array());
        assert_eq!(theta, back);
    }

    #[test]
    fn age_estimate_errors_are_differences() {
        let est = AgeEstimate {
            lower: 3.0,
            median: 4.5,
            upper: 7.0,
        };
        assert!((est.err_minus() - 1.5).abs() < 1e-12);
        assert!((est.err_plus() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn debug_mode_shrinks_sampling() {
        let config = RunConfig {
            job: None,
            data_dir: PathBuf::from("data/photometry"),
            output_dir: PathBuf::from("output"),
            walkers: 64,
            steps: 1500,
            burn_in: 500,
            seed: 42,
            debug: true,
            quiet: true,
            sps: SpsConfig::default(),
        };
        assert!(config.effective_steps() < 100);
        assert!(config.effective_walkers() < config.walkers);
        assert!(!config.persist_chains());
    }
}
