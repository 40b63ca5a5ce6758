//! # sabo-state — Match Lifecycle
//!
//! Every match moves strictly forward through four states:
//!
//! ```text
//! Empty ──place()──▶ AwaitingPlayers ──place()──▶ Ready ──complete()──▶ Completed
//! ```
//!
//! Status is never assigned directly. It is derived from slot occupancy on
//! each placement and flips to `Completed` only inside [`Match::complete()`],
//! in the same step that records the winner and loser. That keeps the three
//! fields from drifting apart, which is how the legacy database ended up
//! with "completed" rows that had no winner.

pub mod lifecycle;

pub use lifecycle::{Match, MatchError, MatchStatus, MatchTransition, Placement, Score};
