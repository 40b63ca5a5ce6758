//! # Read Views
//!
//! `status`, `show`, `events` and `topology`. None of these write the
//! state file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use sabo_bracket::events::{self, verify_chain};
use sabo_bracket::standings::entrant_history;
use sabo_bracket::topology::{self, Delivery, Destination};
use sabo_bracket::{Progress, Standings};
use sabo_core::{EntrantId, MatchId};
use sabo_state::Match;

use crate::state::TournamentState;

/// Arguments for `sabo show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Match key to show.
    #[arg(required_unless_present = "entrant", conflicts_with = "entrant")]
    pub match_id: Option<MatchId>,

    /// Show every match an entrant has played or is booked into.
    #[arg(long)]
    pub entrant: Option<EntrantId>,
}

/// Arguments for `sabo events`.
#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Print raw events as JSON instead of the narrative.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `sabo topology`.
#[derive(Args, Debug)]
pub struct TopologyArgs {
    /// Only this match.
    pub match_id: Option<MatchId>,
}

// ─── Status ─────────────────────────────────────────────────────────

/// Execute `sabo status`.
pub fn run_status(state_path: &Path) -> Result<u8> {
    let state = TournamentState::load(state_path)?;
    let progress = Progress::from_matches(&state.matches);
    let standings = Standings::from_matches(&state.matches);

    println!("Tournament: {} ({})", state.name, state.id);
    println!("  Created: {}", state.created_at);
    println!("  Phase: {}", progress.phase);
    println!("  Matches: {}/{} completed", progress.completed, progress.total);
    for b in &progress.brackets {
        let group = b.group.map(|g| g.as_str()).unwrap_or("X");
        println!(
            "    {group} {:<16} {:>2}/{:<2} done, {} ready",
            b.bracket.label(),
            b.completed,
            b.total,
            b.ready
        );
    }

    if let Some(champion) = &standings.champion {
        println!("  Champion: {champion}");
    }
    if let Some(runner_up) = &standings.runner_up {
        println!("  Runner-up: {runner_up}");
    }
    if !standings.semifinalists.is_empty() {
        let names: Vec<&str> = standings.semifinalists.iter().map(|e| e.as_str()).collect();
        println!("  Semifinalists: {}", names.join(", "));
    }
    for (group, entrant) in &standings.group_finalists {
        println!("  Group {group} finalist: {entrant}");
    }
    Ok(0)
}

// ─── Show ───────────────────────────────────────────────────────────

/// Execute `sabo show`.
pub fn run_show(args: &ShowArgs, state_path: &Path) -> Result<u8> {
    let state = TournamentState::load(state_path)?;

    if let Some(entrant) = &args.entrant {
        let history = entrant_history(&state.matches, entrant);
        if history.is_empty() {
            bail!("{entrant} has not appeared in any match");
        }
        for m in history {
            println!("{}", summary(m));
        }
        return Ok(0);
    }

    let Some(id) = args.match_id else {
        bail!("give a match key or --entrant");
    };
    let m = state
        .matches
        .iter()
        .find(|m| m.id() == id)
        .with_context(|| format!("no match {id} in {}", state_path.display()))?;

    println!("{}", summary(m));
    if let Some(at) = m.updated_at() {
        println!("  Updated: {at}");
    }
    let dest = topology::destination_of(&id)?;
    if let Some(winner) = dest.winner {
        println!("  Winner → {}", edge(&winner));
    }
    if let Some(loser) = dest.loser {
        println!("  Loser → {}", edge(&loser));
    }
    for (i, t) in m.transition_log().iter().enumerate() {
        println!("    [{i}] {} → {} at {} ({})", t.from, t.to, t.at, t.reason);
    }
    Ok(0)
}

fn summary(m: &Match) -> String {
    let name = |e: Option<&EntrantId>| e.map(|e| e.as_str()).unwrap_or("TBD").to_string();
    let mut line = format!(
        "{:<14} {:<16} {} vs {}",
        m.id().to_string(),
        m.status().to_string(),
        name(m.player1()),
        name(m.player2())
    );
    if let Some(winner) = m.winner() {
        line.push_str(&format!(", won by {winner}"));
    }
    if let Some(score) = m.score() {
        line.push_str(&format!(" {score}"));
    }
    line
}

fn edge(dest: &Destination) -> String {
    match dest.delivery {
        Delivery::Direct => dest.slot.to_string(),
        Delivery::GroupResolver(group) => format!("{} (Group {group} resolver)", dest.slot),
        Delivery::CrossResolver => format!("{} (cross resolver)", dest.slot),
    }
}

// ─── Events ─────────────────────────────────────────────────────────

/// Execute `sabo events`. Exits 2 when the chain does not verify.
pub fn run_events(args: &EventsArgs, state_path: &Path) -> Result<u8> {
    let state = TournamentState::load(state_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state.events)?);
    } else {
        for line in events::render(&state.events) {
            println!("{line}");
        }
    }

    match verify_chain(&state.events) {
        Ok(()) => Ok(0),
        Err(e) => {
            eprintln!("FAIL: event log does not verify: {e}");
            Ok(crate::EXIT_FINDINGS)
        }
    }
}

// ─── Topology ───────────────────────────────────────────────────────

/// Execute `sabo topology`. Needs no state file.
pub fn run_topology(args: &TopologyArgs) -> Result<u8> {
    let ids = match args.match_id {
        Some(id) => {
            if !topology::contains(&id) {
                bail!("{id} is not a SABO-32 match");
            }
            vec![id]
        }
        None => topology::all_matches(),
    };
    for id in ids {
        let dest = topology::destination_of(&id)?;
        let winner = dest.winner.map(|d| edge(&d)).unwrap_or_else(|| "champion".into());
        match dest.loser {
            Some(loser) => println!("{:<14} W → {winner}  L → {}", id.to_string(), edge(&loser)),
            None => println!("{:<14} W → {winner}", id.to_string()),
        }
    }
    Ok(0)
}
