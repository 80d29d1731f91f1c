//! Laurel CLI
//!
//! Command-line tools for inspecting and editing Laurel save files offline.
//!
//! # Commands
//!
//! - `inspect` - Display achievements, queues and leaderboards
//! - `report` - Record achievement progress
//! - `score` - Record a leaderboard score
//! - `reset` - Zero every achievement
//! - `export` - Re-encode a snapshot as JSON or CBOR

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Laurel command-line save file tools.
#[derive(Parser)]
#[command(name = "laurel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the game configuration (JSON)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Path to the snapshot (`.cbor` for CBOR, anything else for JSON)
    #[arg(global = true, short, long)]
    snapshot: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display achievements, queues and leaderboards
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Record achievement progress
    Report {
        /// Achievement id
        id: String,

        /// Completion percentage (clamped to 0..=100)
        #[arg(allow_negative_numbers = true)]
        percentage: f64,
    },

    /// Record a leaderboard score
    Score {
        /// Leaderboard id
        leaderboard: String,

        /// Score value
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Player id (defaults to the local player)
        #[arg(short, long)]
        player: Option<String>,
    },

    /// Zero every achievement
    Reset,

    /// Re-encode the snapshot
    Export {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Write CBOR instead of JSON
        #[arg(long)]
        cbor: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("Laurel CLI v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Snapshot format v{}",
            laurel_protocol::SNAPSHOT_VERSION
        );
        return Ok(());
    }

    let config = cli.config.ok_or("Game configuration required (--config)")?;
    let snapshot = cli.snapshot.ok_or("Snapshot path required (--snapshot)")?;

    match cli.command {
        Commands::Inspect { format } => {
            commands::inspect::run(&config, &snapshot, &format)?;
        }
        Commands::Report { id, percentage } => {
            commands::report::run(&config, &snapshot, &id, percentage)?;
        }
        Commands::Score {
            leaderboard,
            value,
            player,
        } => {
            commands::score::run(&config, &snapshot, &leaderboard, value, player.as_deref())?;
        }
        Commands::Reset => {
            commands::reset::run(&config, &snapshot)?;
        }
        Commands::Export { output, cbor } => {
            commands::export::run(&config, &snapshot, &output, cbor)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
