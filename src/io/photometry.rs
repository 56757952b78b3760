//! Photometry slice ingest and normalization.
//!
//! Slice tables are tab-delimited with a fixed preamble convention: three
//! comment lines, the column header, one units line, then data. Missing
//! values are marked `...`. This module turns such a table into a clean,
//! typed `Vec<Observation>`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{Observation, BANDS, N_BANDS};
use crate::error::AppError;

/// Preamble lines before the header (skipped).
const PREAMBLE_LINES: usize = 3;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub snid: Option<u64>,
    pub message: String,
}

/// Ingest output: typed observations + row errors.
#[derive(Debug, Clone)]
pub struct SliceData {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Path of the photometry slice for a job-array index.
pub fn slice_path(data_dir: &Path, job: Option<u32>) -> PathBuf {
    match job {
        Some(id) => data_dir.join(format!("hosts-{id}.tsv")),
        None => data_dir.join("hosts.tsv"),
    }
}

/// Load and normalize a slice table to `Observation`s.
pub fn load_observations(path: &Path) -> Result<SliceData, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::usage(format!("Failed to open slice '{}': {e}", path.display()))
    })?;
    parse_slice(&raw)
}

/// Parse slice-table contents (header-skip convention applied here).
pub fn parse_slice(raw: &str) -> Result<SliceData, AppError> {
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < PREAMBLE_LINES + 2 {
        return Err(AppError::data(
            "Slice table is too short: expected preamble, header, units line, and data.",
        ));
    }

    // Keep the header (line 3) and the data (line 5 onward); the units line
    // between them is display-only.
    let mut kept = String::new();
    kept.push_str(lines[PREAMBLE_LINES]);
    kept.push('\n');
    for line in &lines[PREAMBLE_LINES + 2..] {
        kept.push_str(line);
        kept.push('\n');
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(kept.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read slice header: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in required_columns() {
        if !header_map.contains_key(required.as_str()) {
            return Err(AppError::usage(
                format!("Slice table is missing required column '{required}'."),
            ));
        }
    }

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line numbers count the original file: preamble + header + units.
        let line = idx + PREAMBLE_LINES + 3;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    snid: None,
                    message: format!("TSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(obs) => observations.push(obs),
            Err((snid, message)) => row_errors.push(RowError { line, snid, message }),
        }
    }

    Ok(SliceData {
        observations,
        row_errors,
        rows_read,
    })
}

fn required_columns() -> Vec<String> {
    let mut cols = vec!["snid".to_string(), "redshift".to_string()];
    for band in BANDS {
        cols.push(band.to_string());
        cols.push(format!("err_{band}"));
    }
    cols
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a possible UTF-8 BOM on the first header so schema validation
    // doesn't report the column as missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<Observation, (Option<u64>, String)> {
    let field = |name: &str| -> Option<&str> {
        header_map
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "...")
    };

    let snid_raw = field("snid").ok_or((None, "Missing SNID.".to_string()))?;
    let snid: u64 = snid_raw
        .parse()
        .map_err(|_| (None, format!("Unparseable SNID '{snid_raw}'.")))?;

    let fail = |message: String| (Some(snid), message);

    let redshift: f64 = field("redshift")
        .ok_or_else(|| fail("Missing redshift.".to_string()))?
        .parse()
        .map_err(|_| fail("Unparseable redshift.".to_string()))?;
    if !(redshift.is_finite() && redshift > 0.0) {
        return Err(fail(format!("Non-physical redshift {redshift}.")));
    }

    let mut magnitudes = [0.0; N_BANDS];
    let mut uncertainties = [0.0; N_BANDS];
    for (b, band) in BANDS.iter().enumerate() {
        let mag: f64 = field(band)
            .ok_or_else(|| fail(format!("Missing {band}-band magnitude.")))?
            .parse()
            .map_err(|_| fail(format!("Unparseable {band}-band magnitude.")))?;
        let err: f64 = field(&format!("err_{band}"))
            .ok_or_else(|| fail(format!("Missing {band}-band uncertainty.")))?
            .parse()
            .map_err(|_| fail(format!("Unparseable {band}-band uncertainty.")))?;
        if !mag.is_finite() {
            return Err(fail(format!("Non-finite {band}-band magnitude.")));
        }
        if !(err.is_finite() && err > 0.0) {
            return Err(fail(format!("Non-positive {band}-band uncertainty.")));
        }
        magnitudes[b] = mag;
        uncertainties[b] = err;
    }

    Ok(Observation {
        snid,
        name: field("iau").map(str::to_string),
        redshift,
        magnitudes,
        uncertainties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> String {
        [
            "# host photometry slice",
            "# source: survey model magnitudes",
            "# one row per supernova host",
            "SNID\tIAU\tredshift\tu\tg\tr\ti\tz\terr_u\terr_g\terr_r\terr_i\terr_z",
            "\t\t\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag\tmag",
            "10028\t\t0.065\t21.22\t19.45\t18.64\t18.27\t17.98\t0.041\t0.004\t0.019\t0.012\t0.004",
            "12781\t2006er\t0.084\t24.41\t23.92\t23.08\t22.68\t22.01\t0.49\t0.10\t0.05\t0.05\t0.10",
            "99901\t\t0.2\t22.0\t...\t21.0\t20.5\t20.1\t0.1\t0.1\t0.1\t0.1\t0.1",
            "99902\t\t-1.0\t22.0\t21.5\t21.0\t20.5\t20.1\t0.1\t0.1\t0.1\t0.1\t0.1",
        ]
        .join("\n")
    }

    #[test]
    fn loads_valid_rows_and_reports_bad_ones() {
        let data = parse_slice(&sample_table()).unwrap();
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.observations.len(), 2);
        assert_eq!(data.row_errors.len(), 2);

        let first = &data.observations[0];
        assert_eq!(first.snid, 10028);
        assert!((first.redshift - 0.065).abs() < 1e-12);
        assert_eq!(first.magnitudes[0], 21.22);
        assert_eq!(first.uncertainties[4], 0.004);
        assert!(first.name.is_none());

        let second = &data.observations[1];
        assert_eq!(second.name.as_deref(), Some("2006er"));
    }

    #[test]
    fn missing_value_marker_is_a_row_error_not_a_crash() {
        let data = parse_slice(&sample_table()).unwrap();
        let err = data
            .row_errors
            .iter()
            .find(|e| e.snid == Some(99901))
            .unwrap();
        assert!(err.message.contains("g-band"));
    }

    #[test]
    fn units_line_is_skipped() {
        // If the units line were parsed as data, it would show up as a row
        // error on file line 5; it must not be counted at all.
        let data = parse_slice(&sample_table()).unwrap();
        assert!(data.row_errors.iter().all(|e| e.line >= 6));
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        let table = [
            "# a",
            "# b",
            "# c",
            "SNID\tredshift\tu\tg\tr\ti\tz",
            "units",
            "1\t0.1\t20\t20\t20\t20\t20",
        ]
        .join("\n");
        let err = parse_slice(&table).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn slice_paths_follow_the_job_convention() {
        let dir = Path::new("data/photometry");
        assert_eq!(slice_path(dir, None), dir.join("hosts.tsv"));
        assert_eq!(slice_path(dir, Some(3)), dir.join("hosts-3.tsv"));
    }
}
