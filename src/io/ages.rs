//! Per-slice ages table export.
//!
//! One row per successfully fitted object, tab-delimited with a commented
//! header, easy to concatenate across job-array slices afterwards.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::ObjectFit;
use crate::error::AppError;

/// Path of the ages table for a job-array index.
pub fn ages_path(output_dir: &Path, job: Option<u32>) -> PathBuf {
    match job {
        Some(id) => output_dir.join(format!("ages-{id}.tsv")),
        None => output_dir.join("ages.tsv"),
    }
}

/// Write the ages table for a completed slice.
pub fn write_ages_table(path: &Path, fits: &[ObjectFit]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .map_err(|e| AppError::runtime(format!("Failed to create output dir: {e}")))?;
    }
    let mut file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create ages table '{}': {e}", path.display())))?;

    writeln!(file, "# snid\tredshift\tage\tage_lower\tage_upper\tacceptance\tn_samples")
        .map_err(|e| AppError::runtime(format!("Failed to write ages header: {e}")))?;
    for fit in fits {
        writeln!(
            file,
            "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{}",
            fit.snid,
            fit.redshift,
            fit.estimate.median,
            fit.estimate.lower,
            fit.estimate.upper,
            fit.acceptance,
            fit.n_samples
        )
        .map_err(|e| AppError::runtime(format!("Failed to write ages row: {e}")))?;
    }
    Ok(())
}
