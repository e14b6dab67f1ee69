//! Encounter analyser: built-in modules, configuration and report output.
//!
//! Reads a normalized combat log, runs it through the built-in analysis
//! modules plus any counters declared in configuration, and writes the
//! aggregated report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    events.jsonl     ┌───────────────┐     report.json
//! │ log parser  │ ──────────────────▶ │    analyser   │ ──────────────────▶
//! └─────────────┘    player.json      │ module-engine │
//!                  ─────────────────▶ └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: TOML configuration
//! - [`modules`]: Built-in analysis modules and configured counters
//! - [`output`]: Report writer

pub mod config;
pub mod modules;
pub mod output;

pub use config::{default_config_toml, AnalyserConfig, AnalysisConfig, CounterConfig, OutputConfig, SettingsError};
pub use modules::{builtin_descriptors, descriptors};
pub use output::{read_report, ReportError, ReportWriter, REPORT_FILE};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use encounter_events::{read_jsonl, Event, EventParseError, Player};
use module_engine::{Analysis, AnalysisError, Report};

/// Errors that can occur while running the analyser end to end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Error loading configuration
    #[error("config error: {0}")]
    Settings(#[from] SettingsError),
    /// Error opening an input file
    #[error("cannot read {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed event log
    #[error("event log {}: {source}", .path.display())]
    Events {
        path: PathBuf,
        #[source]
        source: EventParseError,
    },
    /// Malformed player file
    #[error("player file {}: {source}", .path.display())]
    Player {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Module graph or dispatch failure
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    /// Error writing the report
    #[error("output error: {0}")]
    Report(#[from] ReportError),
}

/// Reads a JSON Lines event log.
pub fn load_events(path: &Path) -> Result<Vec<Event>, AppError> {
    let file = File::open(path).map_err(|source| AppError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    read_jsonl(BufReader::new(file)).map_err(|source| AppError::Events {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the analyzed player from a JSON file.
pub fn load_player(path: &Path) -> Result<Player, AppError> {
    let content = std::fs::read_to_string(path).map_err(|source| AppError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| AppError::Player {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs the configured modules over an event log.
pub fn analyse_log(config: &AnalyserConfig, player: Player, events: Vec<Event>) -> Result<Report, AppError> {
    let descriptors = descriptors(config)?;
    let analysis = Analysis::new(player, descriptors)
        .map_err(AnalysisError::from)?
        .with_strict_order(config.analysis.strict_order);

    tracing::info!("Running modules: {}", analysis.handles().join(", "));
    let report = analysis.run(events).map_err(AnalysisError::from)?;
    Ok(report)
}
