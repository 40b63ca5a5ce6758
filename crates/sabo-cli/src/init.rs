//! # Init Subcommand
//!
//! Create a state file from a YAML config: all 55 matches, Winners
//! Bracket round 1 seeded in both groups.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;

use sabo_bracket::{SeedingMode, SeedingPlan};
use sabo_core::Group;

use crate::config::TournamentConfig;
use crate::state::TournamentState;

/// Arguments for `sabo init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Tournament config (YAML).
    pub config: PathBuf,

    /// Replace an existing state file.
    #[arg(long)]
    pub force: bool,
}

/// Execute `sabo init`.
pub fn run_init(args: &InitArgs, state_path: &Path) -> Result<u8> {
    if state_path.exists() && !args.force {
        bail!(
            "tournament already exists at {} (use --force to replace it)",
            state_path.display()
        );
    }

    let config = TournamentConfig::load(&args.config)?;
    let plan = config.plan()?;
    let state = TournamentState::create(&config.name, plan)?;
    state.save(state_path)?;

    println!("OK: created tournament {:?} ({})", state.name, state.id);
    print_draw(&state.plan);
    Ok(0)
}

fn print_draw(plan: &SeedingPlan) {
    if let SeedingMode::Shuffled { seed } = plan.mode() {
        println!("  Draw: shuffled (seed {seed})");
    } else {
        println!("  Draw: list order");
    }
    for group in Group::ALL {
        let names: Vec<&str> = plan.group(group).iter().map(|e| e.as_str()).collect();
        println!("  Group {group}: {}", names.join(" "));
    }
}
