//! Encounter analyser CLI.
//!
//! Runs the built-in modules and configured counters over an event log and
//! writes `report.json` to the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use analyser::{analyse_log, load_events, load_player, AnalyserConfig, AppError, ReportWriter};

/// Command line arguments for the analyser
#[derive(Parser, Debug)]
#[command(name = "analyse")]
#[command(about = "Analyse a normalized combat log for one player")]
struct Args {
    /// Event log, one JSON event per line
    #[arg(long)]
    events: PathBuf,

    /// Player description (JSON)
    #[arg(long)]
    player: PathBuf,

    /// Configuration file (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write report.json into
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Write single-line JSON regardless of configuration
    #[arg(long)]
    compact: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            AnalyserConfig::from_file(path)?
        }
        None => AnalyserConfig::default(),
    };

    let player = load_player(&args.player)?;
    let events = load_events(&args.events)?;
    tracing::info!(
        "Loaded {} events for player {} ({})",
        events.len(),
        player.name,
        player.id
    );

    let report = analyse_log(&config, player, events)?;

    let pretty = config.output.pretty && !args.compact;
    let writer = ReportWriter::new(&args.output)?.with_pretty(pretty);
    let path = writer.write(&report)?;

    tracing::info!(
        "Wrote {} report entries to {}",
        report.entries.len(),
        path.display()
    );
    Ok(())
}
