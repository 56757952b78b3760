//! Per-run log handle.
//!
//! There is no global logger: each run opens a `RunLog` and passes it down
//! explicitly. The handle appends timestamped lines to a per-job file
//! (`logs/snage.log`, or `logs/snage_<job>.log` when a job-array index is
//! given) and optionally echoes them to stderr. No rotation.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::AppError;

pub struct RunLog {
    file: File,
    path: PathBuf,
    quiet: bool,
}

impl RunLog {
    /// Open (appending) the log file for this job under `logs/`.
    pub fn open(job: Option<u32>, quiet: bool) -> Result<Self, AppError> {
        let dir = PathBuf::from("logs");
        create_dir_all(&dir)
            .map_err(|e| AppError::runtime(format!("Failed to create log dir: {e}")))?;

        let name = match job {
            Some(id) => format!("snage_{id}.log"),
            None => "snage.log".to_string(),
        };
        Self::open_at(&dir.join(name), quiet)
    }

    /// Open (appending) a log file at an explicit path.
    pub fn open_at(path: &Path, quiet: bool) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::runtime(format!("Failed to open log '{}': {e}", path.display())))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            quiet,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.write_line("INFO", message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.write_line("WARN", message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.write_line("ERROR", message.as_ref());
    }

    fn write_line(&mut self, level: &str, message: &str) {
        // The path was validated at open; a mid-run disk error only loses log
        // lines, not science, so writes are best-effort.
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(self.file, "{stamp} {level} {message}");
        if !self.quiet {
            eprintln!("{stamp} {level} {message}");
        }
    }
}
