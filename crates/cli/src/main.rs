//! Entry point for the chaff CLI, which finds compiler-synthesized code in instruction
//! listings.
//!
//! This module parses command-line arguments and dispatches to subcommands for decoding a
//! listing or running the coverage filters over it. It initializes logging and handles the
//! main execution flow.

use chaff_cli::commands::{Cmd, Command};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command-line interface for chaff.
///
/// chaff reads a textual listing of a class's method bodies and reports the instruction
/// ranges a compiler generated on its own, which coverage tools should not count.
#[derive(Parser)]
#[command(name = "chaff")]
#[command(about = "chaff: filter compiler-synthesized branches out of bytecode coverage")]
struct Cli {
    /// Path of the instruction listing to read
    input: String,

    #[command(subcommand)]
    command: Cmd,
}

/// Runs the chaff CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute(&cli.input).await
}
