//! # Audit and Repair Subcommands
//!
//! `audit` is read-only and exits 2 when it finds anything, including an
//! event log that no longer verifies. `repair` fills stuck slots, re-runs
//! both stage resolvers, and saves.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use sabo_bracket::events::verify_chain;
use sabo_bracket::{audit, repair, AuditReport};

use crate::state::TournamentState;
use crate::EXIT_FINDINGS;

/// Arguments for `sabo audit`.
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    report: &'a AuditReport,
    event_chain: Option<String>,
}

/// Execute `sabo audit`.
pub fn run_audit(args: &AuditArgs, state_path: &Path) -> Result<u8> {
    let state = TournamentState::load(state_path)?;
    let report = audit(&state.store()?);
    let chain_error = verify_chain(&state.events).err().map(|e| e.to_string());

    if args.json {
        let out = AuditOutput {
            report: &report,
            event_chain: chain_error.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for finding in &report.findings {
            println!("FAIL: {finding}");
        }
        if let Some(e) = &chain_error {
            println!("FAIL: event log: {e}");
        }
    }

    if report.is_clean() && chain_error.is_none() {
        if !args.json {
            println!("OK: {} matches checked, no findings", report.checked);
        }
        Ok(0)
    } else {
        tracing::warn!(findings = report.findings.len(), "audit found problems");
        Ok(EXIT_FINDINGS)
    }
}

/// Execute `sabo repair`.
pub fn run_repair(state_path: &Path) -> Result<u8> {
    let mut state = TournamentState::load(state_path)?;
    let engine = state.engine()?;
    let result = repair(&engine);
    state.absorb(engine);
    state.save(state_path)?;

    let report = result?;
    for fill in &report.repaired {
        println!("REPAIRED: {} → {} ({})", fill.entrant, fill.slot, fill.status);
    }
    for finding in &report.remaining {
        println!("REMAINING: {finding}");
    }
    if report.remaining.is_empty() {
        println!("OK: {} slots repaired", report.repaired.len());
        Ok(0)
    } else {
        Ok(EXIT_FINDINGS)
    }
}
