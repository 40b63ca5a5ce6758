//! # Advancement Errors
//!
//! Every failure of the engine and resolvers is a typed [`AdvanceError`].
//! Callers can tell "the submitted result was wrong" (`InvalidResult`,
//! nothing changed) apart from "the bracket is inconsistent"
//! (`SlotCollision`, `StageBlocked`, `InvalidTopology`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabo_core::{CanonicalizationError, EntrantId, MatchId, SlotRef};
use sabo_state::MatchError;

use crate::engine::AdvancementOutcome;
use crate::resolver::{SlotFill, StageResolution};
use crate::seeding::SeedingError;
use crate::store::StoreError;
use crate::topology::TopologyError;

/// A destination slot that already held someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    /// The contested slot.
    pub slot: SlotRef,
    /// Who holds it.
    pub occupant: EntrantId,
    /// Who was refused.
    pub incoming: EntrantId,
}

impl std::fmt::Display for Collision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} holds {}, refused {}",
            self.slot, self.occupant, self.incoming
        )
    }
}

/// Errors raised while recording results or resolving stages.
#[derive(Error, Debug)]
pub enum AdvanceError {
    /// The result was refused. The match is unchanged.
    #[error("invalid result for {match_id}: {reason}")]
    InvalidResult {
        /// The match the result was submitted for.
        match_id: MatchId,
        /// Why the match refused it.
        reason: MatchError,
    },

    /// A downstream slot already held a different entrant.
    ///
    /// The source match stays `Completed`. `partial` carries what the
    /// request did manage to write, when the failure happened inside
    /// `record_result`.
    #[error("slot collision: {collision}")]
    SlotCollision {
        /// The refused placement.
        collision: Collision,
        /// Work done before the collision.
        partial: Option<Box<AdvancementOutcome>>,
    },

    /// A resolver found one of its destination slots taken.
    ///
    /// The resolver still writes every other slot of the stage; `written`
    /// lists them.
    #[error("{stage} blocked: {collision}")]
    StageBlocked {
        /// The stage being resolved.
        stage: StageResolution,
        /// The first refused placement.
        collision: Collision,
        /// Slots the resolver did fill.
        written: Vec<SlotFill>,
    },

    /// The coordinate is not part of the fixed format.
    #[error(transparent)]
    InvalidTopology(#[from] TopologyError),

    /// The seeding plan was refused.
    #[error(transparent)]
    Seeding(#[from] SeedingError),

    /// The store failed for a reason other than a refused result.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An event could not be canonicalized for the log.
    #[error("event log error: {0}")]
    EventLog(#[from] CanonicalizationError),
}

impl AdvanceError {
    /// Whether the caller's input was at fault (as opposed to the bracket).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidResult { .. } | Self::Seeding(_))
    }
}
