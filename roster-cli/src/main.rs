//! Roster — shared fleet membership over a version-controlled registry.
//!
//! # Usage
//!
//! ```text
//! roster run [--config <path>] [--name <dns-name>] [--store-dir <dir>]
//!            [--refresh-interval <secs>] [--registration-interval <secs>]
//!            [--unhealthy-threshold <secs>] [--json-logs]
//! roster stop
//! roster status [--json]
//! roster targets [--json]
//! roster peers --store-dir <dir> [--unhealthy-threshold <secs>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{peers::PeersArgs, run::RunArgs, status::StatusArgs, targets::TargetsArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Keep a fleet-wide peer list in a shared registry",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the registration/refresh daemon in the foreground.
    Run(RunArgs),

    /// Request graceful daemon shutdown over the status socket.
    Stop,

    /// Show this node's registration status.
    Status(StatusArgs),

    /// Show the healthy peers the running daemon currently sees.
    Targets(TargetsArgs),

    /// Read peer records straight from a registry directory.
    Peers(PeersArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Stop => commands::stop::run(),
        Commands::Status(args) => args.run(),
        Commands::Targets(args) => args.run(),
        Commands::Peers(args) => args.run(),
    }
}
