//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the sampling code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::data::HostQueryOutcome;
use crate::domain::{ObjectFit, RunConfig};

/// Header block printed at the start of a batch run.
pub fn format_run_summary(config: &RunConfig, n_objects: usize, n_row_errors: usize) -> String {
    let mut out = String::new();

    out.push_str("=== snage - host-galaxy age estimation ===\n");
    match config.job {
        Some(id) => out.push_str(&format!("Job slice: {id}\n")),
        None => out.push_str("Job slice: default\n"),
    }
    out.push_str(&format!(
        "Objects: {n_objects} usable ({n_row_errors} rows skipped)\n"
    ));
    out.push_str(&format!(
        "Sampler: {} walkers x {} steps ({} burn-in){}\n",
        config.effective_walkers(),
        config.effective_steps(),
        config.effective_burn_in(),
        if config.debug { " [debug]" } else { "" },
    ));
    out.push_str(&format!(
        "Model: sfh={:?} dust={:?} metallicity={:?} neb={} igm={}\n",
        config.sps.sfh,
        config.sps.dust_law,
        config.sps.metallicity,
        config.sps.neb_emission,
        config.sps.igm_absorption,
    ));
    out
}

/// One line per completed object.
pub fn format_object_result(fit: &ObjectFit) -> String {
    format!(
        "SN{}: age {} (z={:.4}, acceptance {:.2}, {} samples)",
        fit.snid, fit.estimate, fit.redshift, fit.acceptance, fit.n_samples
    )
}

/// Closing block for a batch: successes, failures, output location.
pub fn format_batch_footer(fits: &[ObjectFit], failures: &[(u64, String)]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\nCompleted {} object(s), {} failed.\n",
        fits.len(),
        failures.len()
    ));
    for (snid, reason) in failures {
        out.push_str(&format!("  failed SN{snid}: {reason}\n"));
    }
    out
}

/// Human-readable catalog lookup outcome.
pub fn format_fetch_outcome(outcome: &HostQueryOutcome) -> String {
    match outcome {
        HostQueryOutcome::Found(row) => {
            let specz = row
                .specz
                .map(|z| format!("{z:.4}"))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "objid {} at ({:.5}, {:.5}) specz={} ugriz=[{:.2} {:.2} {:.2} {:.2} {:.2}]",
                row.objid, row.ra, row.dec, specz, row.u, row.g, row.r, row.i, row.z
            )
        }
        HostQueryOutcome::NotFound => "not found".to_string(),
        HostQueryOutcome::Ambiguous(rows) => {
            let mut out = format!("ambiguous: {} distinct objects\n", rows.len());
            for row in rows {
                out.push_str(&format!(
                    "  objid {} at ({:.5}, {:.5}) r={:.2}\n",
                    row.objid, row.ra, row.dec, row.r
                ));
            }
            out
        }
    }
}
