//! # Stage Resolvers
//!
//! The Group Resolver fills a group's two Group Final matches, the
//! Cross-Bracket Resolver the two Cross Semifinals. Each acts only once
//! all four of its source matches are `Completed`, and then writes every
//! destination slot from the source winners.
//!
//! Pairing follows the topology table, keyed by slot index, so the result
//! does not depend on which source finished last. Both resolvers are
//! idempotent: a slot already holding the right entrant is left alone, so
//! the engine may call them after every qualifying event.
//!
//! A taken slot does not stop the other three writes. The resolver fills
//! what it can and reports the first refusal as
//! [`AdvanceError::StageBlocked`] together with the slots it wrote.

use serde::{Deserialize, Serialize};

use sabo_core::{BracketKind, EntrantId, Group, MatchId, SlotRef};
use sabo_state::MatchStatus;

use crate::error::{AdvanceError, Collision};
use crate::store::{MatchStore, SetPlayer};
use crate::topology::{self, Delivery};

/// A stage opened by a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageResolution {
    /// The two Group Final matches of one group.
    GroupFinal(Group),
    /// The two Cross Semifinals.
    CrossBracket,
}

impl StageResolution {
    /// How the resolver delivers into this stage.
    pub fn delivery(self) -> Delivery {
        match self {
            Self::GroupFinal(g) => Delivery::GroupResolver(g),
            Self::CrossBracket => Delivery::CrossResolver,
        }
    }
}

impl std::fmt::Display for StageResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupFinal(g) => write!(f, "Group {g} final"),
            Self::CrossBracket => f.write_str("cross bracket"),
        }
    }
}

/// A slot written by a resolver (or the engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFill {
    /// The slot.
    pub slot: SlotRef,
    /// Who was placed.
    pub entrant: EntrantId,
    /// State of the destination match afterwards.
    pub status: MatchStatus,
}

/// Whether a stage's sources are all decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum StageState {
    /// Some sources are still open. Nothing was written.
    Pending {
        /// Source matches not yet completed.
        waiting_on: Vec<MatchId>,
    },
    /// Every source is complete and every destination slot is filled.
    Resolved,
}

/// Outcome of [`resolve_group_final()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFinalResolution {
    /// Which group.
    pub group: Group,
    /// Source readiness.
    pub state: StageState,
    /// Group Final match 1 has both players.
    pub match1_ready: bool,
    /// Group Final match 2 has both players.
    pub match2_ready: bool,
    /// Slots written by this call. Empty on a repeat call.
    pub written: Vec<SlotFill>,
}

/// Outcome of [`resolve_cross_bracket()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossBracketResolution {
    /// Source readiness.
    pub state: StageState,
    /// Cross Semifinal 1 has both players.
    pub semifinal1_ready: bool,
    /// Cross Semifinal 2 has both players.
    pub semifinal2_ready: bool,
    /// Slots written by this call. Empty on a repeat call.
    pub written: Vec<SlotFill>,
}

/// Fill a group's two Group Final matches: WB R3 M1 winner vs Losers
/// Branch A champion, WB R3 M2 winner vs Losers Branch B champion.
pub fn resolve_group_final<S>(store: &S, group: Group) -> Result<GroupFinalResolution, AdvanceError>
where
    S: MatchStore + ?Sized,
{
    let (state, written) = resolve_stage(
        store,
        &topology::group_final_sources(group),
        StageResolution::GroupFinal(group),
    )?;
    let gf = |slot| MatchId::in_group(group, BracketKind::GroupFinal, 1, slot);
    Ok(GroupFinalResolution {
        group,
        state,
        match1_ready: has_both_players(store, &gf(1))?,
        match2_ready: has_both_players(store, &gf(2))?,
        written,
    })
}

/// Fill the two Cross Semifinals: Group A GF-n winner vs Group B GF-n
/// winner, Group A in `player1`.
pub fn resolve_cross_bracket<S>(store: &S) -> Result<CrossBracketResolution, AdvanceError>
where
    S: MatchStore + ?Sized,
{
    let (state, written) = resolve_stage(
        store,
        &topology::cross_bracket_sources(),
        StageResolution::CrossBracket,
    )?;
    let sf = |slot| MatchId::cross(BracketKind::CrossSemifinal, 1, slot);
    Ok(CrossBracketResolution {
        state,
        semifinal1_ready: has_both_players(store, &sf(1))?,
        semifinal2_ready: has_both_players(store, &sf(2))?,
        written,
    })
}

fn resolve_stage<S>(
    store: &S,
    sources: &[MatchId; 4],
    stage: StageResolution,
) -> Result<(StageState, Vec<SlotFill>), AdvanceError>
where
    S: MatchStore + ?Sized,
{
    let mut winners = Vec::with_capacity(sources.len());
    let mut waiting_on = Vec::new();
    for id in sources {
        let m = store.get(id)?;
        match m.winner() {
            Some(w) if m.is_completed() => winners.push((*id, w.clone())),
            _ => waiting_on.push(*id),
        }
    }
    if !waiting_on.is_empty() {
        return Ok((StageState::Pending { waiting_on }, Vec::new()));
    }

    let mut written = Vec::new();
    let mut refused = None;
    for (source, winner) in winners {
        let Some(dest) = topology::destination_of(&source)?.winner else {
            continue;
        };
        debug_assert_eq!(dest.delivery, stage.delivery());
        match store.try_set_player(&dest.slot, &winner)? {
            SetPlayer::Placed(status) => {
                tracing::debug!(slot = %dest.slot, entrant = %winner, "resolver placed entrant");
                written.push(SlotFill {
                    slot: dest.slot,
                    entrant: winner,
                    status,
                });
            }
            SetPlayer::Unchanged => {}
            SetPlayer::Collision { occupant } => {
                tracing::debug!(slot = %dest.slot, occupant = %occupant, "resolver slot taken");
                refused.get_or_insert(Collision {
                    slot: dest.slot,
                    occupant,
                    incoming: winner,
                });
            }
        }
    }
    match refused {
        Some(collision) => Err(AdvanceError::StageBlocked {
            stage,
            collision,
            written,
        }),
        None => Ok((StageState::Resolved, written)),
    }
}

fn has_both_players<S>(store: &S, id: &MatchId) -> Result<bool, AdvanceError>
where
    S: MatchStore + ?Sized,
{
    Ok(store.get(id)?.filled_slots() == 2)
}
