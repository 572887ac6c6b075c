use std::path::PathBuf;

use clap::{Parser, Subcommand};
use timestudy_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "timestudy", version, about = "Time-and-motion study CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shift tracking: cycles and breaks for one worker
    Shift {
        #[command(subcommand)]
        action: commands::shift::ShiftAction,
    },
    /// Lap stopwatch
    Stopwatch {
        #[command(subcommand)]
        action: commands::stopwatch::StopwatchAction,
    },
    /// Saved sessions
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Export a saved session as a report
    Export {
        /// Session ID
        id: String,
        /// Output format: csv or json (defaults to export.default_format)
        #[arg(long)]
        format: Option<String>,
        /// Output directory (defaults to export.directory, then Downloads)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `logging.level`.
///
/// A config that fails to load is reported once the subscriber exists.
fn init_logging() {
    let mut load_error = None;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match Config::load() {
            Ok(config) => config.logging.level,
            Err(e) => {
                load_error = Some(e);
                Config::default().logging.level
            }
        };
        EnvFilter::new(level)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = load_error {
        tracing::warn!(error = %e, "using default configuration");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Shift { action } => commands::shift::run(action),
        Commands::Stopwatch { action } => commands::stopwatch::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Export { id, format, out } => commands::export::run(id, format, out),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
