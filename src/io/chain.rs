//! Chain table read/write.
//!
//! Chains are persisted as tab-delimited tables with a commented header: one
//! comment line recording the forward-model configuration version, one naming
//! the columns. The format is meant to be trivially loadable by downstream
//! notebooks as well as by the `plot` subcommand.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{Chain, CHAIN_COLUMNS, N_PARAMS, SPS_CONFIG_VERSION};
use crate::error::AppError;

/// A chain reloaded from disk.
#[derive(Debug, Clone)]
pub struct ChainFile {
    pub chain: Chain,
    /// Rows discarded because they contained non-finite values.
    pub dropped_rows: usize,
}

/// Path of the persisted chain for one object.
pub fn chain_path(output_dir: &Path, snid: u64) -> PathBuf {
    output_dir.join(format!("SN{snid}_chain.tsv"))
}

/// Write a chain (parameters + age column) to `path`.
pub fn write_chain(path: &Path, chain: &Chain) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .map_err(|e| AppError::runtime(format!("Failed to create output dir: {e}")))?;
    }
    let mut file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create chain '{}': {e}", path.display())))?;

    writeln!(file, "# sps_config_version: {SPS_CONFIG_VERSION}")
        .map_err(|e| AppError::runtime(format!("Failed to write chain header: {e}")))?;
    writeln!(file, "# {}", CHAIN_COLUMNS.join("\t"))
        .map_err(|e| AppError::runtime(format!("Failed to write chain header: {e}")))?;

    for (row, age) in chain.params.iter().zip(chain.ages.iter()) {
        let mut fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        fields.push(age.to_string());
        writeln!(file, "{}", fields.join("\t"))
            .map_err(|e| AppError::runtime(format!("Failed to write chain row: {e}")))?;
    }
    Ok(())
}

/// Read a chain table, dropping rows with non-finite values (the same
/// cleaning the corner-plot path has always needed).
pub fn read_chain(path: &Path) -> Result<ChainFile, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::usage(format!("Failed to open chain '{}': {e}", path.display())))?;

    let mut params = Vec::new();
    let mut ages = Vec::new();
    let mut dropped = 0usize;

    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != N_PARAMS + 1 {
            return Err(AppError::data(
                format!(
                    "Chain '{}' line {}: expected {} columns, found {}.",
                    path.display(),
                    idx + 1,
                    N_PARAMS + 1,
                    fields.len()
                ),
            ));
        }

        let mut values = [0.0; N_PARAMS + 1];
        let mut ok = true;
        for (i, field) in fields.iter().enumerate() {
            match field.parse::<f64>() {
                Ok(v) if v.is_finite() => values[i] = v,
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            dropped += 1;
            continue;
        }

        let mut row = [0.0; N_PARAMS];
        row.copy_from_slice(&values[..N_PARAMS]);
        params.push(row);
        ages.push(values[N_PARAMS]);
    }

    if params.is_empty() {
        return Err(AppError::data(
            format!("Chain '{}' has no usable rows.", path.display()),
        ));
    }

    Ok(ChainFile {
        chain: Chain { params, ages },
        dropped_rows: dropped,
    })
}
