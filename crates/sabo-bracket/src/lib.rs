//! # sabo-bracket — SABO-32 Advancement Engine
//!
//! The fixed 32-entrant double-elimination format: two groups of 16, each
//! with a Winners Bracket, two Losers Branches and two independent Group
//! Finals, feeding a four-player cross-bracket stage.
//!
//! ## Architecture
//!
//! ```text
//!   result ─▶ AdvancementEngine ─▶ topology::destination_of()
//!                  │                       │
//!                  ▼                       ▼
//!             MatchStore  ◀──────  resolver (Group / Cross)
//!                  │
//!                  ▼
//!              EventLog  (hash-chained)
//! ```
//!
//! - [`topology`] — the wiring table. Pure functions, no state.
//! - [`store`] — the storage contract and a row-locked in-memory store.
//! - [`engine`] — `record_result`, the single entry point for results.
//! - [`resolver`] — idempotent stage openers.
//! - [`events`] — append-only, verifiable log of every placement.
//! - [`seeding`], [`standings`], [`audit`] — setup, read views, and
//!   reconciliation of damaged state.
//!
//! ## Crate Policy
//!
//! - Only this crate knows the bracket wiring; `sabo-state` knows a single
//!   match, `sabo-core` knows neither.
//! - No `unsafe`, no `.unwrap()` outside tests.

pub mod audit;
pub mod engine;
pub mod error;
pub mod events;
pub mod resolver;
pub mod seeding;
pub mod standings;
pub mod store;
pub mod topology;

pub use audit::{audit, repair, AuditReport, Finding, RepairReport};
pub use engine::{AdvancementEngine, AdvancementOutcome, SeedingOutcome};
pub use error::{AdvanceError, Collision};
pub use events::{AdvancementEvent, EventKind, EventLog, EventLogError};
pub use resolver::{
    resolve_cross_bracket, resolve_group_final, CrossBracketResolution, GroupFinalResolution,
    SlotFill, StageResolution, StageState,
};
pub use seeding::{SeedingError, SeedingMode, SeedingPlan};
pub use standings::{Phase, Progress, Standings};
pub use store::{MatchStore, MemoryMatchStore, SetPlayer, StoreError};
pub use topology::{Delivery, Destination, Destinations, SlotSource, TopologyError};
