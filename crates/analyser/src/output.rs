//! Report output.
//!
//! Writes the aggregated [`Report`] of a run into an output directory.
//!
//! # Output Files
//!
//! - `report.json` - Module outputs in display order, with warnings

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use module_engine::Report;

pub const REPORT_FILE: &str = "report.json";

/// Errors that can occur during output operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes reports into an output directory.
#[derive(Debug)]
pub struct ReportWriter {
    output_dir: PathBuf,
    pretty: bool,
}

impl ReportWriter {
    /// Creates a writer for the given directory, creating it if needed.
    pub fn new(output_dir: &Path) -> Result<Self, ReportError> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            pretty: true,
        })
    }

    /// Chooses between indented and single-line JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Returns the output directory path.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the report file.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    /// Writes the report, replacing any previous one.
    pub fn write(&self, report: &Report) -> Result<PathBuf, ReportError> {
        let path = self.report_path();
        let mut writer = BufWriter::new(File::create(&path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, report)?;
        } else {
            serde_json::to_writer(&mut writer, report)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(path)
    }
}

/// Reads a report written by [`ReportWriter`].
pub fn read_report(path: &Path) -> Result<Report, ReportError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
