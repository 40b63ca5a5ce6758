//! # sabo-core — Foundational Types for the SABO-32 Bracket Engine
//!
//! Leaf crate of the workspace. Defines the identifiers, bracket coordinates,
//! and integrity primitives that every other `sabo-*` crate builds on; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Named coordinates, not magic numbers.** A match is addressed by
//!    `(group, bracket, round, slot)` with closed enums for `Group` and
//!    `BracketKind`. There is no "round 101 means losers branch A" encoding
//!    anywhere in the stack.
//!
//! 2. **Newtype identifiers.** `EntrantId` and `TournamentId` are validated
//!    newtypes. An entrant id cannot be confused with a match key.
//!
//! 3. **Deterministic fingerprints.** Snapshots and event-log entries are
//!    digested through `CanonicalBytes`, so the same bracket state always
//!    yields the same digest regardless of map iteration order.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sabo-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod coordinate;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use coordinate::{BracketKind, Group, MatchId, SlotPosition, SlotRef};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, SaboError};
pub use identity::{EntrantId, TournamentId};
pub use temporal::Timestamp;
