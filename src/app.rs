//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - opens the per-run log handle
//! - dispatches to the batch/fit/fetch/plot front-ends
//! - prints reports

use std::path::Path;

use clap::Parser;

use crate::cli::{BatchArgs, Command, FetchArgs, FitArgs, ModelArgs, PlotArgs, SamplerArgs};
use crate::data::CatalogClient;
use crate::domain::{Observation, RunConfig, SpsConfig, N_BANDS};
use crate::error::AppError;
use crate::logging::RunLog;

pub mod pipeline;

/// Entry point for the `snage` binary.
pub fn run() -> Result<(), AppError> {
    // Job arrays invoke this as `snage <index>`, and a bare `snage` means the
    // default single-run mode; both should behave like `snage batch ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the scheduler-friendly invocation.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Batch(args) => handle_batch(args),
        Command::Fit(args) => handle_fit(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = run_config_from_args(
        args.job,
        &args.data_dir,
        &args.output_dir,
        &args.sampler,
        &args.model,
    );
    let mut log = RunLog::open(config.job, config.quiet)?;
    log.info("Starting");

    let out = pipeline::run_batch(&config, &mut log)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &config,
            out.fits.len() + out.failures.len(),
            out.rows_skipped
        )
    );
    for fit in &out.fits {
        println!("{}", crate::report::format_object_result(fit));
    }
    println!("{}", crate::report::format_batch_footer(&out.fits, &out.failures));
    println!("Ages table: {}", out.ages_path.display());

    log.info("Done");
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let obs = observation_from_args(&args)?;
    // A single-object fit reads no slice table; the data dir is unused.
    let config = run_config_from_args(None, Path::new(""), &args.output_dir, &args.sampler, &args.model);
    let mut log = RunLog::open(None, config.quiet)?;

    log.info(format!("getting age for SN{}", obs.snid));
    let sp = crate::sps::StellarPopulation::new(config.sps.clone());
    let (fit, _chain) = pipeline::run_object(&obs, &sp, &config)?;
    log.info(format!("age for SN{}: {}", fit.snid, fit.estimate));

    println!("{}", crate::report::format_object_result(&fit));
    if let Some(path) = &fit.chain_path {
        println!("Chain: {}", path.display());
    }
    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let mut log = RunLog::open(None, args.quiet)?;
    log.info(format!("querying catalog at ({:.5}, {:.5})", args.ra, args.dec));

    let client = CatalogClient::from_env();
    let outcome = client.fetch_host(args.ra, args.dec)?;

    // "Not found" and ambiguity are logged results, not errors.
    match &outcome {
        crate::data::HostQueryOutcome::NotFound => {
            log.warn(format!("host at ({:.5}, {:.5}) not found", args.ra, args.dec));
        }
        crate::data::HostQueryOutcome::Ambiguous(rows) => {
            log.warn(format!(
                "host at ({:.5}, {:.5}) ambiguous: {} distinct objects, review manually",
                args.ra,
                args.dec,
                rows.len()
            ));
        }
        crate::data::HostQueryOutcome::Found(row) => {
            log.info(format!("host found: objid {}", row.objid));
        }
    }

    println!("{}", crate::report::format_fetch_outcome(&outcome));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let mut log = RunLog::open(None, args.quiet)?;

    let chain_path = args
        .chain
        .clone()
        .unwrap_or_else(|| crate::io::chain::chain_path(&args.output_dir, args.snid));
    let loaded = crate::io::chain::read_chain(&chain_path)?;
    if loaded.dropped_rows > 0 {
        log.warn(format!(
            "dropped {} non-finite row(s) from {}",
            loaded.dropped_rows,
            chain_path.display()
        ));
    }

    let figure = crate::plot::figure_path(&args.figures_dir, args.snid);
    crate::plot::render_corner(&figure, &loaded.chain)?;
    log.info(format!("wrote corner plot {}", figure.display()));
    println!("{}", figure.display());
    Ok(())
}

fn observation_from_args(args: &FitArgs) -> Result<Observation, AppError> {
    if args.mags.len() != N_BANDS || args.errs.len() != N_BANDS {
        return Err(AppError::usage(
            format!(
                "Expected {N_BANDS} comma-separated values for --mags and --errs, got {} and {}.",
                args.mags.len(),
                args.errs.len()
            ),
        ));
    }
    let mut magnitudes = [0.0; N_BANDS];
    let mut uncertainties = [0.0; N_BANDS];
    magnitudes.copy_from_slice(&args.mags);
    uncertainties.copy_from_slice(&args.errs);
    Ok(Observation {
        snid: args.snid,
        name: None,
        redshift: args.redshift,
        magnitudes,
        uncertainties,
    })
}

pub fn run_config_from_args(
    job: Option<u32>,
    data_dir: &Path,
    output_dir: &Path,
    sampler: &SamplerArgs,
    model: &ModelArgs,
) -> RunConfig {
    RunConfig {
        job,
        data_dir: data_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        walkers: sampler.walkers,
        steps: sampler.steps,
        burn_in: sampler.burn_in,
        seed: sampler.seed,
        debug: sampler.debug,
        quiet: sampler.quiet,
        sps: SpsConfig {
            metallicity: model.metallicity,
            dust_law: model.dust_law,
            sfh: model.sfh,
            neb_emission: !model.no_neb_emission,
            igm_absorption: model.igm_absorption,
            ..SpsConfig::default()
        },
    }
}

/// Rewrite argv so `snage` defaults to `snage batch`.
///
/// Rules:
/// - `snage`                     -> `snage batch`
/// - `snage 4`                   -> `snage batch 4` (job-array invocation)
/// - `snage --debug ...`         -> `snage batch --debug ...`
/// - `snage --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("batch".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "batch" | "fit" | "fetch" | "plot");
    if is_subcommand {
        return argv;
    }

    // A bare job index or a leading flag means "batch".
    if arg1.parse::<u32>().is_ok() || arg1.starts_with('-') {
        argv.insert(1, "batch".to_string());
        return argv;
    }

    // Otherwise, leave as-is (clap will produce the usage error).
    argv
}
