//! Shared fit pipeline used by the `batch` and `fit` front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load slice -> sample posterior -> derive ages -> persist chain -> report
//!
//! The batch loop is the only place with a partial-failure policy: one
//! object's fit failure is logged and the slice continues.

use crate::domain::{Chain, ObjectFit, Observation, RunConfig};
use crate::error::AppError;
use crate::fit::age::{build_chain, estimate_age};
use crate::fit::sampler::{object_seed, run_ensemble, SamplerSettings};
use crate::io::ages::{ages_path, write_ages_table};
use crate::io::chain::{chain_path, write_chain};
use crate::io::photometry::{load_observations, slice_path};
use crate::logging::RunLog;
use crate::sps::StellarPopulation;

/// All computed outputs of a batch run.
#[derive(Debug)]
pub struct BatchOutput {
    pub fits: Vec<ObjectFit>,
    /// Objects whose fit failed, with the reason (the batch continued).
    pub failures: Vec<(u64, String)>,
    pub ages_path: std::path::PathBuf,
    pub rows_skipped: usize,
}

/// Run the full pipeline over the slice selected by `config.job`.
pub fn run_batch(config: &RunConfig, log: &mut RunLog) -> Result<BatchOutput, AppError> {
    let path = slice_path(&config.data_dir, config.job);
    log.info(format!("importing {}", path.display()));

    let slice = load_observations(&path)?;
    for err in &slice.row_errors {
        match err.snid {
            Some(snid) => log.warn(format!("skipping SN{snid} (line {}): {}", err.line, err.message)),
            None => log.warn(format!("skipping line {}: {}", err.line, err.message)),
        }
    }
    if slice.observations.is_empty() {
        return Err(AppError::data(
            format!("No usable observations in '{}'.", path.display()),
        ));
    }

    let sp = StellarPopulation::new(config.sps.clone());
    let mut fits = Vec::new();
    let mut failures = Vec::new();

    for obs in &slice.observations {
        log.info(format!("getting age for SN{}", obs.snid));
        match run_object(obs, &sp, config) {
            Ok((fit, _)) => {
                log.info(format!("age for SN{}: {}", fit.snid, fit.estimate));
                fits.push(fit);
            }
            Err(e) => {
                // Partial-failure isolation: the slice keeps going.
                log.error(format!("fit failed for SN{}: {e}", obs.snid));
                failures.push((obs.snid, e.to_string()));
            }
        }
    }

    let ages = ages_path(&config.output_dir, config.job);
    write_ages_table(&ages, &fits)?;
    log.info(format!("wrote {} age(s) to {}", fits.len(), ages.display()));

    Ok(BatchOutput {
        fits,
        failures,
        ages_path: ages,
        rows_skipped: slice.row_errors.len(),
    })
}

/// Fit a single observation: sample, derive ages, persist, summarize.
///
/// Returns the summary plus the full chain (the `fit` front-end plots it
/// directly; the batch loop drops it after the summary line).
pub fn run_object(
    obs: &Observation,
    sp: &StellarPopulation,
    config: &RunConfig,
) -> Result<(ObjectFit, Chain), AppError> {
    let settings = SamplerSettings {
        walkers: config.effective_walkers(),
        steps: config.effective_steps(),
        burn_in: config.effective_burn_in(),
        seed: object_seed(config.seed, obs.snid),
    };

    let run = run_ensemble(obs, sp, &settings)?;
    let chain = build_chain(run.chain, obs.redshift, sp)?;
    let estimate = estimate_age(&chain)?;

    let chain_file = if config.persist_chains() {
        let path = chain_path(&config.output_dir, obs.snid);
        write_chain(&path, &chain)?;
        Some(path)
    } else {
        None
    };

    let fit = ObjectFit {
        snid: obs.snid,
        redshift: obs.redshift,
        estimate,
        acceptance: run.acceptance,
        n_samples: chain.len(),
        chain_path: chain_file,
    };
    Ok((fit, chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpsConfig;
    use std::fs::create_dir_all;
    use std::path::PathBuf;

    fn debug_config(data_dir: PathBuf, output_dir: PathBuf) -> RunConfig {
        RunConfig {
            job: Some(7),
            data_dir,
            output_dir,
            walkers: 64,
            steps: 1500,
            burn_in: 500,
            seed: 42,
            debug: true,
            quiet: true,
            sps: SpsConfig::default(),
        }
    }

    fn write_slice(dir: &PathBuf, rows: &[&str]) -> PathBuf {
        create_dir_all(dir).unwrap();
        let path = dir.join("hosts-7.tsv");
        let mut table = vec![
            "# host photometry slice".to_string(),
            "# test fixture".to_string(),
            "# one row per supernova host".to_string(),
            "SNID\tIAU\tredshift\tu\tg\tr\ti\tz\terr_u\terr_g\terr_r\terr_i\terr_z".to_string(),
            "\t\t\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag".to_string(),
        ];
        table.extend(rows.iter().map(|r| r.to_string()));
        std::fs::write(&path, table.join("\n")).unwrap();
        path
    }

    #[test]
    fn debug_run_returns_a_finite_ordered_estimate_for_sn10028() {
        let base = std::env::temp_dir().join("snage-pipeline-single");
        let config = debug_config(base.join("data"), base.join("output"));
        let obs = Observation {
            snid: 10028,
            name: None,
            redshift: 0.065,
            magnitudes: [21.22, 19.45, 18.64, 18.27, 17.98],
            uncertainties: [0.041, 0.004, 0.019, 0.012, 0.004],
        };
        let sp = StellarPopulation::new(config.sps.clone());
        let (fit, chain) = run_object(&obs, &sp, &config).unwrap();
        assert_eq!(chain.len(), fit.n_samples);

        let est = fit.estimate;
        assert!(est.lower.is_finite() && est.median.is_finite() && est.upper.is_finite());
        assert!(est.lower <= est.median && est.median <= est.upper);
        // Debug mode never persists chains.
        assert!(fit.chain_path.is_none());
        assert_eq!(fit.n_samples, 16 * 50);
    }

    #[test]
    fn batch_continues_past_a_failing_object() {
        let base = std::env::temp_dir().join("snage-pipeline-batch");
        let data_dir = base.join("data");
        let output_dir = base.join("output");
        // SN777 carries a redshift so high that the observation epoch
        // predates any allowed star formation: its fit fails. SN10028 is fine.
        write_slice(
            &data_dir,
            &[
                "777\t\t9.0\t22.0\t21.5\t21.0\t20.5\t20.1\t0.1\t0.1\t0.1\t0.1\t0.1",
                "10028\t\t0.065\t21.22\t19.45\t18.64\t18.27\t17.98\t0.041\t0.004\t0.019\t0.012\t0.004",
            ],
        );

        let config = debug_config(data_dir, output_dir.clone());
        let mut log = RunLog::open_at(&base.join("test.log"), true).unwrap();
        let out = run_batch(&config, &mut log).unwrap();

        assert_eq!(out.fits.len(), 1);
        assert_eq!(out.fits[0].snid, 10028);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].0, 777);

        // The ages table lists the surviving object.
        let contents = std::fs::read_to_string(&out.ages_path).unwrap();
        assert!(contents.contains("10028"));
        assert!(!contents.contains("777\t"));
    }

    #[test]
    fn empty_slice_is_a_data_error() {
        let base = std::env::temp_dir().join("snage-pipeline-empty");
        let data_dir = base.join("data");
        write_slice(&data_dir, &["999\t\t-1.0\t22\t21\t21\t20\t20\t0.1\t0.1\t0.1\t0.1\t0.1"]);
        let config = debug_config(data_dir, base.join("output"));
        let mut log = RunLog::open_at(&base.join("test.log"), true).unwrap();
        let err = run_batch(&config, &mut log).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
