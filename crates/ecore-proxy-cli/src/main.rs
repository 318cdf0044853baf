//! ecore-proxy command-line tool
//!
//! Inspects class schemas, validates bridge configuration files and runs a
//! demo of the proxy protocol against the in-memory heap.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecore-proxy")]
#[command(about = "Inspect and exercise ecore-proxy schemas", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the classes and feature ids of a schema file
    Inspect {
        /// Schema file (TOML)
        schema: PathBuf,
        /// Only show this class
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Validate a bridge configuration file
    Check {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run the built-in model against the in-memory heap
    Demo {
        /// Configuration file (TOML); defaults apply when absent
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { schema, class } => commands::inspect::execute(&schema, class.as_deref()),
        Commands::Check { config } => commands::check::execute(&config),
        Commands::Demo { config } => commands::demo::execute(config.as_deref()),
    }
}
