//! osmsync CLI
//!
//! Command-line tools for replication working directories.
//!
//! # Commands
//!
//! - `inspect` - Display the current replication state
//! - `verify` - Check the state file against its audit trail
//! - `history` - List the audit trail

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// osmsync replication state tools.
#[derive(Parser)]
#[command(name = "osmsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the replication working directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the current replication state
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify the state file and its audit copy
    Verify,

    /// List saved sequences, newest first
    History {
        /// Maximum number of sequences to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Working directory path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Working directory path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::History { limit } => {
            let path = cli.path.ok_or("Working directory path required for history")?;
            commands::history::run(&path, limit)?;
        }
        Commands::Version => {
            println!("osmsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
