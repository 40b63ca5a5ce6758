//! # Advancement Engine
//!
//! [`AdvancementEngine::record_result()`] is the only way a result enters
//! the bracket. One call:
//!
//! 1. checks the coordinate against the topology,
//! 2. completes the match in the store (winner, loser and status change
//!    in one row update),
//! 3. places the winner and, for Winners Bracket rounds 1 and 2, the loser
//!    into their direct destination slots,
//! 4. runs the Group or Cross-Bracket Resolver when the match feeds one,
//! 5. crowns the champion when the match is the Cross Final.
//!
//! Everything written is reported in the returned [`AdvancementOutcome`]
//! and appended to the [`EventLog`] as one contiguous batch, so another
//! thread's events never land between a `MatchCompleted` and its
//! placements.
//!
//! ## Failure Semantics
//!
//! A refused result (`InvalidResult`) changes nothing. A collision in a
//! downstream slot does not roll the completed match back; the remaining
//! direct placements are still attempted, resolvers are skipped, and the
//! error carries the partial outcome for manual reconciliation. A resolver
//! that hits a taken slot still fills the rest of its stage, and those
//! fills are part of the partial outcome.
//!
//! ## Stage Locks
//!
//! Each stage has its own lock, held while its resolver runs. When the
//! last two sources of a stage complete at once, one call writes the
//! stage and logs `StageResolved`; the other finds it already filled.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use sabo_core::{EntrantId, Group, MatchId, SlotRef};
use sabo_state::{MatchError, Score};

use crate::error::{AdvanceError, Collision};
use crate::events::{EventKind, EventLog};
use crate::resolver::{self, SlotFill, StageResolution, StageState};
use crate::seeding::SeedingPlan;
use crate::store::{MatchStore, SetPlayer, StoreError};
use crate::topology::{self, Delivery, Destinations};

/// Everything one `record_result` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementOutcome {
    /// The match that was completed.
    pub completed: MatchId,
    /// Its winner.
    pub winner: EntrantId,
    /// Its loser.
    pub loser: EntrantId,
    /// Slots written, in order: direct placements first, then resolver
    /// placements.
    pub placements: Vec<SlotFill>,
    /// Resolvers that opened a stage during this call.
    pub resolved: Vec<StageResolution>,
    /// Set when the Cross Final was completed.
    pub champion: Option<EntrantId>,
}

/// Result of a successful seeding call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedingOutcome {
    /// Slots written.
    pub placed: Vec<SlotFill>,
    /// Slots that already held the planned entrant.
    pub unchanged: usize,
}

enum Delivered {
    Filled(SlotFill),
    AlreadyThere,
    Refused(Collision),
}

/// The bracket state machine over a [`MatchStore`].
///
/// All methods take `&self`; results for different matches may be
/// recorded from several threads at once. Per-match serialization is
/// the store's job; per-stage serialization is the engine's.
#[derive(Debug)]
pub struct AdvancementEngine<S: MatchStore> {
    store: S,
    events: EventLog,
    /// Group A final, Group B final, cross bracket.
    stage_locks: [Mutex<()>; 3],
}

impl<S: MatchStore> AdvancementEngine<S> {
    /// Engine with an empty event log.
    pub fn new(store: S) -> Self {
        Self::with_events(store, EventLog::new())
    }

    /// Engine resuming an existing event log.
    pub fn with_events(store: S, events: EventLog) -> Self {
        Self {
            store,
            events,
            stage_locks: Default::default(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take the engine apart.
    pub fn into_parts(self) -> (S, EventLog) {
        (self.store, self.events)
    }

    /// Fill Winners Bracket round 1 of both groups from a plan.
    ///
    /// Re-seeding with the same plan is a no-op. Any slot holding a
    /// different entrant is a collision and nothing further is written.
    pub fn seed(&self, plan: &SeedingPlan) -> Result<SeedingOutcome, AdvanceError> {
        let assignments = plan.assignments();
        for (slot, entrant) in &assignments {
            if let Some(occupant) = self.store.get(&slot.match_id)?.player(slot.position) {
                if occupant != entrant {
                    return Err(AdvanceError::SlotCollision {
                        collision: Collision {
                            slot: *slot,
                            occupant: occupant.clone(),
                            incoming: entrant.clone(),
                        },
                        partial: None,
                    });
                }
            }
        }

        let mut placed = Vec::new();
        let mut unchanged = 0;
        for (slot, entrant) in assignments {
            match self.store.try_set_player(&slot, &entrant)? {
                SetPlayer::Placed(status) => placed.push(SlotFill {
                    slot,
                    entrant,
                    status,
                }),
                SetPlayer::Unchanged => unchanged += 1,
                SetPlayer::Collision { occupant } => {
                    return Err(AdvanceError::SlotCollision {
                        collision: Collision {
                            slot,
                            occupant,
                            incoming: entrant,
                        },
                        partial: None,
                    });
                }
            }
        }

        if !placed.is_empty() {
            self.events.append(EventKind::TournamentSeeded {
                entrants: placed.len(),
            })?;
            tracing::info!(entrants = placed.len(), "tournament seeded");
        }
        Ok(SeedingOutcome { placed, unchanged })
    }

    /// Record `winner` as the winner of `match_id` and advance both
    /// players.
    pub fn record_result(
        &self,
        match_id: &MatchId,
        winner: &EntrantId,
    ) -> Result<AdvancementOutcome, AdvanceError> {
        self.advance(match_id, winner.clone(), None)
    }

    /// Record a scored result. The winner is whoever holds the strictly
    /// higher score; a tie is an invalid result.
    pub fn record_scored_result(
        &self,
        match_id: &MatchId,
        score: Score,
    ) -> Result<AdvancementOutcome, AdvanceError> {
        topology::destination_of(match_id)?;
        let current = self.store.get(match_id)?;
        let invalid = |reason| AdvanceError::InvalidResult {
            match_id: *match_id,
            reason,
        };
        if !current.is_playable() {
            return Err(invalid(MatchError::NotReady {
                match_id: *match_id,
                status: current.status(),
            }));
        }
        let winner = match score.leader() {
            Some(position) => current.player(position).cloned(),
            None => {
                return Err(invalid(MatchError::TiedScore {
                    match_id: *match_id,
                    score,
                }))
            }
        };
        let Some(winner) = winner else {
            return Err(invalid(MatchError::NotReady {
                match_id: *match_id,
                status: current.status(),
            }));
        };
        self.advance(match_id, winner, Some(score))
    }

    fn place(
        &self,
        slot: SlotRef,
        entrant: &EntrantId,
        delivery: Delivery,
        batch: &mut Vec<EventKind>,
    ) -> Result<Delivered, AdvanceError> {
        match self.store.try_set_player(&slot, entrant)? {
            SetPlayer::Placed(status) => {
                tracing::debug!(slot = %slot, entrant = %entrant, %status, "placed entrant");
                batch.push(EventKind::PlayerPlaced {
                    slot,
                    entrant: entrant.clone(),
                    delivery,
                });
                Ok(Delivered::Filled(SlotFill {
                    slot,
                    entrant: entrant.clone(),
                    status,
                }))
            }
            SetPlayer::Unchanged => Ok(Delivered::AlreadyThere),
            SetPlayer::Collision { occupant } => {
                tracing::warn!(
                    slot = %slot,
                    occupant = %occupant,
                    incoming = %entrant,
                    "slot collision, placement refused"
                );
                batch.push(EventKind::PlacementFailed {
                    slot,
                    occupant: occupant.clone(),
                    incoming: entrant.clone(),
                });
                Ok(Delivered::Refused(Collision {
                    slot,
                    occupant,
                    incoming: entrant.clone(),
                }))
            }
        }
    }

    fn stage_lock(&self, stage: StageResolution) -> &Mutex<()> {
        let index = match stage {
            StageResolution::GroupFinal(Group::A) => 0,
            StageResolution::GroupFinal(Group::B) => 1,
            StageResolution::CrossBracket => 2,
        };
        &self.stage_locks[index]
    }

    /// Run the resolver for `stage` under its lock and queue events for
    /// what it wrote.
    ///
    /// Returns the slots written, or `None` when the stage is still
    /// waiting on sources. Only the call that fills the stage queues
    /// `StageResolved`. On [`AdvanceError::StageBlocked`] the slots that
    /// were written and the refusal are queued before the error is
    /// returned.
    pub(crate) fn resolve(
        &self,
        stage: StageResolution,
        batch: &mut Vec<EventKind>,
    ) -> Result<Option<Vec<SlotFill>>, AdvanceError> {
        let _guard = self.stage_lock(stage).lock();
        let resolved = match stage {
            StageResolution::GroupFinal(group) => {
                resolver::resolve_group_final(&self.store, group).map(|r| (r.state, r.written))
            }
            StageResolution::CrossBracket => {
                resolver::resolve_cross_bracket(&self.store).map(|r| (r.state, r.written))
            }
        };
        let (state, written) = match resolved {
            Ok(r) => r,
            Err(AdvanceError::StageBlocked {
                stage,
                collision,
                written,
            }) => {
                tracing::warn!(
                    %stage,
                    %collision,
                    filled = written.len(),
                    "resolver hit an occupied slot"
                );
                push_placements(batch, &written, stage.delivery());
                batch.push(EventKind::PlacementFailed {
                    slot: collision.slot,
                    occupant: collision.occupant.clone(),
                    incoming: collision.incoming.clone(),
                });
                return Err(AdvanceError::StageBlocked {
                    stage,
                    collision,
                    written,
                });
            }
            Err(e) => return Err(e),
        };
        if let StageState::Pending { waiting_on } = state {
            tracing::debug!(%stage, waiting = waiting_on.len(), "stage not ready");
            return Ok(None);
        }
        if !written.is_empty() {
            tracing::info!(%stage, slots = written.len(), "stage resolved");
            batch.push(EventKind::StageResolved { stage });
            push_placements(batch, &written, stage.delivery());
        }
        Ok(Some(written))
    }

    fn advance(
        &self,
        match_id: &MatchId,
        winner: EntrantId,
        score: Option<Score>,
    ) -> Result<AdvancementOutcome, AdvanceError> {
        let destinations = topology::destination_of(match_id)?;

        let completed = match self.store.set_result(match_id, &winner, score) {
            Ok(m) => m,
            Err(StoreError::Rejected(reason)) => {
                tracing::info!(match_id = %match_id, entrant = %winner, %reason, "result refused");
                return Err(AdvanceError::InvalidResult {
                    match_id: *match_id,
                    reason,
                });
            }
            Err(other) => return Err(other.into()),
        };
        let loser = completed
            .loser()
            .cloned()
            .ok_or_else(|| AdvanceError::InvalidResult {
                match_id: *match_id,
                reason: MatchError::Inconsistent {
                    match_id: *match_id,
                    detail: "completed without a loser".to_string(),
                },
            })?;

        tracing::info!(match_id = %match_id, winner = %winner, loser = %loser, "match completed");
        let mut batch = vec![EventKind::MatchCompleted {
            match_id: *match_id,
            winner: winner.clone(),
            loser: loser.clone(),
            score,
        }];
        let outcome = AdvancementOutcome {
            completed: *match_id,
            winner,
            loser,
            placements: Vec::new(),
            resolved: Vec::new(),
            champion: None,
        };

        let result = self.propagate(outcome, &destinations, &mut batch);
        self.events.append_all(batch)?;
        result
    }

    /// Everything after the match itself is completed. Events go into
    /// `batch`; the caller appends it whatever the result.
    fn propagate(
        &self,
        mut outcome: AdvancementOutcome,
        destinations: &Destinations,
        batch: &mut Vec<EventKind>,
    ) -> Result<AdvancementOutcome, AdvanceError> {
        let mut first_collision = None;
        let mut stages = Vec::new();
        let edges = [
            destinations.winner.map(|d| (d, outcome.winner.clone())),
            destinations.loser.map(|d| (d, outcome.loser.clone())),
        ];
        for (dest, entrant) in edges.into_iter().flatten() {
            match dest.delivery {
                Delivery::Direct => {
                    match self.place(dest.slot, &entrant, Delivery::Direct, batch)? {
                        Delivered::Filled(fill) => outcome.placements.push(fill),
                        Delivered::AlreadyThere => {}
                        Delivered::Refused(collision) => {
                            first_collision.get_or_insert(collision);
                        }
                    }
                }
                Delivery::GroupResolver(group) => stages.push(StageResolution::GroupFinal(group)),
                Delivery::CrossResolver => stages.push(StageResolution::CrossBracket),
            }
        }

        if let Some(collision) = first_collision {
            return Err(AdvanceError::SlotCollision {
                collision,
                partial: Some(Box::new(outcome)),
            });
        }

        for stage in stages {
            match self.resolve(stage, batch) {
                Ok(Some(written)) => {
                    if !written.is_empty() {
                        outcome.resolved.push(stage);
                        outcome.placements.extend(written);
                    }
                }
                Ok(None) => {}
                Err(AdvanceError::StageBlocked {
                    collision, written, ..
                }) => {
                    outcome.placements.extend(written);
                    return Err(AdvanceError::SlotCollision {
                        collision,
                        partial: Some(Box::new(outcome)),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if destinations.winner.is_none() {
            tracing::info!(entrant = %outcome.winner, "champion crowned");
            batch.push(EventKind::ChampionCrowned {
                entrant: outcome.winner.clone(),
            });
            outcome.champion = Some(outcome.winner.clone());
        }

        Ok(outcome)
    }
}

fn push_placements(batch: &mut Vec<EventKind>, fills: &[SlotFill], delivery: Delivery) {
    batch.extend(fills.iter().map(|fill| EventKind::PlayerPlaced {
        slot: fill.slot,
        entrant: fill.entrant.clone(),
        delivery,
    }));
}
