//! ReconSync CLI
//!
//! Command-line tools for exercising a ReconSync schema against a
//! file-backed store.
//!
//! # Commands
//!
//! - `upload` - Apply an upload batch and persist the store
//! - `download` - Print a download response
//! - `inspect` - Display per-model row and tombstone counts
//! - `check-schema` - Validate a schema file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ReconSync command-line tools.
#[derive(Parser)]
#[command(name = "reconsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the schema file (JSON)
    #[arg(global = true, short, long)]
    schema: Option<PathBuf>,

    /// Path to the store snapshot (JSON); created on first write
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an upload batch and print the response
    Upload {
        /// Path to the batch file (JSON upload request)
        batch: PathBuf,

        /// Principal to run the batch as
        #[arg(short, long)]
        principal: Option<String>,
    },

    /// Print a download response
    Download {
        /// Types to download
        #[arg(short = 't', long = "type", required = true)]
        types: Vec<String>,

        /// Path to a cursor file from a previous download
        #[arg(short, long)]
        cursor: Option<PathBuf>,
    },

    /// Display per-model statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate the schema file and list its types
    CheckSchema,

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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Upload { batch, principal } => {
            let schema = cli.schema.ok_or("Schema path required for upload")?;
            let data = cli.data.ok_or("Data path required for upload")?;
            commands::upload::run(&schema, &data, &batch, principal)?;
        }
        Commands::Download { types, cursor } => {
            let schema = cli.schema.ok_or("Schema path required for download")?;
            let data = cli.data.ok_or("Data path required for download")?;
            commands::download::run(&schema, &data, types, cursor.as_deref())?;
        }
        Commands::Inspect { format } => {
            let data = cli.data.ok_or("Data path required for inspect")?;
            commands::inspect::run(&data, &format)?;
        }
        Commands::CheckSchema => {
            let schema = cli.schema.ok_or("Schema path required for check-schema")?;
            commands::check_schema::run(&schema)?;
        }
        Commands::Version => {
            println!("ReconSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ReconSync Core v{}", reconsync_core::VERSION);
            println!("Protocol v{}", reconsync_protocol::PROTOCOL_VERSION);
        }
    }

    Ok(())
}
