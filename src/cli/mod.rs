//! Command-line parsing for the host-age pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/sampling code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DustLaw, MetallicityMode, SfhKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "snage", version, about = "SN host-galaxy stellar-population age estimation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every host in a photometry slice (job-array entry point).
    Batch(BatchArgs),
    /// Fit a single host from photometry given on the command line.
    Fit(FitArgs),
    /// Cone-search the remote catalog for host photometry.
    Fetch(FetchArgs),
    /// Render a corner plot from a persisted chain.
    Plot(PlotArgs),
}

/// Sampler dimensions shared by `batch` and `fit`.
#[derive(Debug, Args, Clone)]
pub struct SamplerArgs {
    /// Ensemble walkers (even).
    #[arg(long, default_value_t = 64)]
    pub walkers: usize,

    /// Total steps per walker.
    #[arg(long, default_value_t = 1500)]
    pub steps: usize,

    /// Steps discarded before retention.
    #[arg(long, default_value_t = 500)]
    pub burn_in: usize,

    /// Base RNG seed (combined with each SNID for per-object chains).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Run incredibly short and in no way accurately; skips chain
    /// persistence. Useful to check a value comes out at all.
    #[arg(long)]
    pub debug: bool,

    /// Do not echo log lines to stderr.
    #[arg(long)]
    pub quiet: bool,
}

/// Forward-model options shared by `batch` and `fit`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Star-formation-history family.
    #[arg(long, value_enum, default_value_t = SfhKind::LinExpLateLinear)]
    pub sfh: SfhKind,

    /// Dust attenuation law.
    #[arg(long, value_enum, default_value_t = DustLaw::PowerLaw)]
    pub dust_law: DustLaw,

    /// Metallicity handling.
    #[arg(long, value_enum, default_value_t = MetallicityMode::Continuous)]
    pub metallicity: MetallicityMode,

    /// Disable nebular emission for young populations.
    #[arg(long)]
    pub no_neb_emission: bool,

    /// Apply IGM absorption to the bluest band.
    #[arg(long)]
    pub igm_absorption: bool,
}

/// Options for a job-slice run.
#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Job-array index; selects `<data-dir>/hosts-<N>.tsv` and the log file.
    pub job: Option<u32>,

    /// Directory holding photometry slices.
    #[arg(long, default_value = "data/photometry")]
    pub data_dir: PathBuf,

    /// Directory receiving chain tables and the ages table.
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub sampler: SamplerArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Options for a single-object fit.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Supernova identifier (used for seeding and output naming).
    #[arg(long)]
    pub snid: u64,

    /// Host redshift.
    #[arg(long)]
    pub redshift: f64,

    /// Apparent ugriz magnitudes, comma-separated (5 values).
    #[arg(long, value_delimiter = ',')]
    pub mags: Vec<f64>,

    /// 1σ magnitude uncertainties, comma-separated (5 values).
    #[arg(long, value_delimiter = ',')]
    pub errs: Vec<f64>,

    /// Directory receiving the chain table.
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub sampler: SamplerArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Options for a standalone catalog lookup.
#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Right ascension (degrees).
    #[arg(long)]
    pub ra: f64,

    /// Declination (degrees).
    #[arg(long)]
    pub dec: f64,

    /// Do not echo log lines to stderr.
    #[arg(long)]
    pub quiet: bool,
}

/// Options for corner-plot rendering.
#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// SNID whose chain to plot.
    pub snid: u64,

    /// Chain table path (defaults to `<output-dir>/SN<snid>_chain.tsv`).
    #[arg(long)]
    pub chain: Option<PathBuf>,

    /// Directory the chain was persisted to.
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Directory receiving the rendered figure.
    #[arg(long, default_value = "figures")]
    pub figures_dir: PathBuf,

    /// Do not echo log lines to stderr.
    #[arg(long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_accepts_a_positional_job_index() {
        let cli = Cli::parse_from(["snage", "batch", "3", "--debug"]);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.job, Some(3));
                assert!(args.sampler.debug);
                assert_eq!(args.sampler.walkers, 64);
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn fit_parses_comma_separated_photometry() {
        let cli = Cli::parse_from([
            "snage",
            "fit",
            "--snid",
            "10028",
            "--redshift",
            "0.065",
            "--mags",
            "21.22,19.45,18.64,18.27,17.98",
            "--errs",
            "0.041,0.004,0.019,0.012,0.004",
        ]);
        match cli.command {
            Command::Fit(args) => {
                assert_eq!(args.mags.len(), 5);
                assert_eq!(args.errs.len(), 5);
                assert_eq!(args.mags[2], 18.64);
            }
            other => panic!("expected fit, got {other:?}"),
        }
    }

    #[test]
    fn model_flags_resolve_to_enums() {
        let cli = Cli::parse_from(["snage", "batch", "--sfh", "lin-exp", "--dust-law", "calzetti"]);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.model.sfh, SfhKind::LinExp);
                assert_eq!(args.model.dust_law, DustLaw::Calzetti);
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }
}
