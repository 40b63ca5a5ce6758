//! # sabo CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sabo_cli::init::{run_init, InitArgs};
use sabo_cli::play::{run_record, run_simulate, RecordArgs, SimulateArgs};
use sabo_cli::reconcile::{run_audit, run_repair, AuditArgs};
use sabo_cli::report::{
    run_events, run_show, run_status, run_topology, EventsArgs, ShowArgs, TopologyArgs,
};
use sabo_cli::DEFAULT_STATE_PATH;

/// SABO-32 tournament tool
///
/// Runs a 32-entrant double-elimination tournament: two groups of 16
/// feeding a four-player cross bracket. Results advance both players
/// automatically; the whole tournament lives in one JSON state file.
#[derive(Parser, Debug)]
#[command(name = "sabo", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the tournament state file.
    #[arg(long, global = true, default_value = DEFAULT_STATE_PATH)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create and seed a tournament from a YAML config.
    Init(InitArgs),

    /// Record a match result and advance both players.
    Record(RecordArgs),

    /// Play out the remaining matches (player1 wins unless --seed is given).
    Simulate(SimulateArgs),

    /// Show phase, bracket progress and standings.
    Status,

    /// Show one match, or every match of one entrant.
    Show(ShowArgs),

    /// Print the event log and verify its hash chain.
    Events(EventsArgs),

    /// Check every match against the bracket wiring.
    Audit(AuditArgs),

    /// Fill stuck slots and re-run the stage resolvers.
    Repair,

    /// Print where each match sends its winner and loser.
    Topology(TopologyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!(state = %cli.state.display(), "sabo starting");

    let state = cli.state.as_path();
    let result = match &cli.command {
        Commands::Init(args) => run_init(args, state),
        Commands::Record(args) => run_record(args, state),
        Commands::Simulate(args) => run_simulate(args, state),
        Commands::Status => run_status(state),
        Commands::Show(args) => run_show(args, state),
        Commands::Events(args) => run_events(args, state),
        Commands::Audit(args) => run_audit(args, state),
        Commands::Repair => run_repair(state),
        Commands::Topology(args) => run_topology(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
