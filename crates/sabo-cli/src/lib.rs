//! # sabo-cli — CLI Tool for SABO-32 Tournaments
//!
//! Provides the `sabo` command-line interface. A tournament lives in one
//! JSON state file holding the seeding plan, all 55 match records and the
//! hash-chained event log. Every command loads it, runs the engine over an
//! in-memory store, and writes it back.
//!
//! ## Subcommands
//!
//! - `sabo init` — Seed a new tournament from a YAML config.
//! - `sabo record` — Record one result (winner or score).
//! - `sabo simulate` — Play out the remaining matches.
//! - `sabo status` / `show` / `events` / `topology` — Read views.
//! - `sabo audit` / `repair` — Reconcile damaged state.
//!
//! ```bash
//! sabo init tournament.yaml
//! sabo record A-WB-R1-M1 p01
//! sabo record A-WB-R1-M2 --score 3-7
//! sabo status
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod init;
pub mod play;
pub mod reconcile;
pub mod report;
pub mod state;

/// Where the state file lives unless `--state` says otherwise.
pub const DEFAULT_STATE_PATH: &str = ".sabo/tournament.json";

/// Exit code for a command that ran but found problems.
pub const EXIT_FINDINGS: u8 = 2;
