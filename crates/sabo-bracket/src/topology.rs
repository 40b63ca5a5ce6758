//! # Bracket Topology
//!
//! The fixed SABO-32 wiring as a lookup table. Nothing here touches a
//! store; every function is pure.
//!
//! ## Shape
//!
//! ```text
//!   per group (×2)                                     cross stage
//!   ───────────────────────────────────────────────    ─────────────
//!   WB R1 (8) ─w─▶ WB R2 (4) ─w─▶ WB R3 (2) ─w─▶ GF p1
//!      │l             │l                            GF (2) ─w─▶ SF (2) ─w─▶ CF
//!      ▼              ▼
//!   LA R1 (4) ─▶ LA R2 (2) ─▶ LA R3 (1) ─w─▶ GF M1 p2
//!                LB R1 (2) ─▶ LB R2 (1) ─w─▶ GF M2 p2
//! ```
//!
//! Inside a bracket, slot `s` of round `r` feeds slot `ceil(s/2)` of round
//! `r+1`; odd slots fill `player1`, even slots `player2`. Edges that cross
//! a stage boundary (into a Group Final or a Cross Semifinal) are not
//! written by the engine directly. They are delivered by the resolvers
//! once every source of the stage is complete.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabo_core::{BracketKind, Group, MatchId, SlotPosition, SlotRef};

/// Entrants per group.
pub const GROUP_SIZE: usize = 16;

/// Entrants per tournament.
pub const ENTRANT_COUNT: usize = 2 * GROUP_SIZE;

/// Matches inside one group: WB 14 + LA 7 + LB 3 + GF 2.
pub const MATCHES_PER_GROUP: usize = 26;

/// Cross Semifinals plus the Cross Final.
pub const CROSS_MATCHES: usize = 3;

/// Every match of a tournament.
pub const TOTAL_MATCHES: usize = 2 * MATCHES_PER_GROUP + CROSS_MATCHES;

/// The match whose winner is champion.
pub const CROSS_FINAL: MatchId = MatchId::cross(BracketKind::CrossFinal, 1, 1);

/// Raised for coordinates outside the fixed format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// No match with this coordinate exists in a SABO-32 bracket.
    #[error("{0} is not a SABO-32 match")]
    UnknownMatch(MatchId),
}

/// How a destination slot gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "via", content = "stage")]
pub enum Delivery {
    /// The engine places the entrant as soon as the source completes.
    Direct,
    /// Written by the Group Resolver of this group.
    GroupResolver(Group),
    /// Written by the Cross-Bracket Resolver.
    CrossResolver,
}

/// One edge out of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    /// Where the entrant lands.
    pub slot: SlotRef,
    /// Who writes it.
    pub delivery: Delivery,
}

/// Both edges out of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    /// `None` only for the Cross Final.
    pub winner: Option<Destination>,
    /// `Some` only for Winners Bracket rounds 1 and 2.
    pub loser: Option<Destination>,
}

/// What fills a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "match_id")]
pub enum SlotSource {
    /// Filled at seeding time (Winners Bracket round 1).
    Seeded,
    /// The winner of this match.
    WinnerOf(MatchId),
    /// The loser of this match.
    LoserOf(MatchId),
}

impl SlotSource {
    /// The upstream match, if any.
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            Self::Seeded => None,
            Self::WinnerOf(id) | Self::LoserOf(id) => Some(*id),
        }
    }
}

/// Matches per round for a bracket kind, indexed by `round - 1`.
pub fn round_sizes(bracket: BracketKind) -> &'static [u8] {
    match bracket {
        BracketKind::WinnersBracket => &[8, 4, 2],
        BracketKind::LosersBranchA => &[4, 2, 1],
        BracketKind::LosersBranchB => &[2, 1],
        BracketKind::GroupFinal => &[2],
        BracketKind::CrossSemifinal => &[2],
        BracketKind::CrossFinal => &[1],
    }
}

/// Number of matches in one bracket of one group (or of the cross stage).
pub fn bracket_size(bracket: BracketKind) -> usize {
    round_sizes(bracket).iter().map(|n| usize::from(*n)).sum()
}

/// Whether `id` names a match of the fixed format.
pub fn contains(id: &MatchId) -> bool {
    if id.group.is_some() != id.bracket.is_group_stage() {
        return false;
    }
    let sizes = round_sizes(id.bracket);
    match sizes.get(usize::from(id.round).wrapping_sub(1)) {
        Some(size) => id.slot >= 1 && id.slot <= *size,
        None => false,
    }
}

/// Every match id of one bracket of one group, in round then slot order.
pub fn matches_in(group: Option<Group>, bracket: BracketKind) -> Vec<MatchId> {
    let mut out = Vec::with_capacity(bracket_size(bracket));
    for (idx, size) in round_sizes(bracket).iter().enumerate() {
        let round = idx as u8 + 1;
        for slot in 1..=*size {
            out.push(MatchId {
                group,
                bracket,
                round,
                slot,
            });
        }
    }
    out
}

/// Every match of the tournament in canonical order: Group A brackets,
/// Group B brackets, then the cross stage.
pub fn all_matches() -> Vec<MatchId> {
    let mut out = Vec::with_capacity(TOTAL_MATCHES);
    for group in Group::ALL {
        for bracket in BracketKind::ALL.into_iter().filter(|b| b.is_group_stage()) {
            out.extend(matches_in(Some(group), bracket));
        }
    }
    out.extend(matches_in(None, BracketKind::CrossSemifinal));
    out.extend(matches_in(None, BracketKind::CrossFinal));
    out
}

/// Matches of one round, in slot order.
pub fn round_of(group: Option<Group>, bracket: BracketKind, round: u8) -> Vec<MatchId> {
    matches_in(group, bracket)
        .into_iter()
        .filter(|m| m.round == round)
        .collect()
}

/// The last round of a bracket.
pub fn final_round(bracket: BracketKind) -> u8 {
    round_sizes(bracket).len() as u8
}

/// Where the winner and loser of `id` go.
pub fn destination_of(id: &MatchId) -> Result<Destinations, TopologyError> {
    if !contains(id) {
        return Err(TopologyError::UnknownMatch(*id));
    }

    let direct = |bracket: BracketKind, round: u8| Destination {
        slot: MatchId {
            group: id.group,
            bracket,
            round,
            slot: id.feed_slot(),
        }
        .slot_ref(id.feed_position()),
        delivery: Delivery::Direct,
    };

    let dest = match (id.group, id.bracket) {
        (Some(group), BracketKind::WinnersBracket) => match id.round {
            1 => Destinations {
                winner: Some(direct(BracketKind::WinnersBracket, 2)),
                loser: Some(direct(BracketKind::LosersBranchA, 1)),
            },
            2 => Destinations {
                winner: Some(direct(BracketKind::WinnersBracket, 3)),
                loser: Some(direct(BracketKind::LosersBranchB, 1)),
            },
            // Each semifinal winner anchors its own Group Final.
            _ => Destinations {
                winner: Some(Destination {
                    slot: MatchId::in_group(group, BracketKind::GroupFinal, 1, id.slot)
                        .slot_ref(SlotPosition::Player1),
                    delivery: Delivery::GroupResolver(group),
                }),
                loser: None,
            },
        },
        (Some(group), kind @ (BracketKind::LosersBranchA | BracketKind::LosersBranchB)) => {
            if id.round < final_round(kind) {
                Destinations {
                    winner: Some(direct(kind, id.round + 1)),
                    loser: None,
                }
            } else {
                let gf_slot = if kind == BracketKind::LosersBranchA { 1 } else { 2 };
                Destinations {
                    winner: Some(Destination {
                        slot: MatchId::in_group(group, BracketKind::GroupFinal, 1, gf_slot)
                            .slot_ref(SlotPosition::Player2),
                        delivery: Delivery::GroupResolver(group),
                    }),
                    loser: None,
                }
            }
        }
        (Some(group), BracketKind::GroupFinal) => {
            let position = match group {
                Group::A => SlotPosition::Player1,
                Group::B => SlotPosition::Player2,
            };
            Destinations {
                winner: Some(Destination {
                    slot: MatchId::cross(BracketKind::CrossSemifinal, 1, id.slot).slot_ref(position),
                    delivery: Delivery::CrossResolver,
                }),
                loser: None,
            }
        }
        (None, BracketKind::CrossSemifinal) => Destinations {
            winner: Some(Destination {
                slot: CROSS_FINAL.slot_ref(id.feed_position()),
                delivery: Delivery::Direct,
            }),
            loser: None,
        },
        (None, BracketKind::CrossFinal) => Destinations {
            winner: None,
            loser: None,
        },
        _ => return Err(TopologyError::UnknownMatch(*id)),
    };
    Ok(dest)
}

/// The inverse of [`destination_of()`]: what fills `slot`.
pub fn sources_of(slot: &SlotRef) -> Result<SlotSource, TopologyError> {
    let id = slot.match_id;
    if !contains(&id) {
        return Err(TopologyError::UnknownMatch(id));
    }
    if id.bracket == BracketKind::WinnersBracket && id.round == 1 {
        return Ok(SlotSource::Seeded);
    }
    for upstream in all_matches() {
        let dest = destination_of(&upstream)?;
        if dest.winner.map(|d| d.slot) == Some(*slot) {
            return Ok(SlotSource::WinnerOf(upstream));
        }
        if dest.loser.map(|d| d.slot) == Some(*slot) {
            return Ok(SlotSource::LoserOf(upstream));
        }
    }
    Err(TopologyError::UnknownMatch(id))
}

/// The four matches feeding a group's two Group Finals, in
/// `[GF1.p1, GF1.p2, GF2.p1, GF2.p2]` order.
pub fn group_final_sources(group: Group) -> [MatchId; 4] {
    [
        MatchId::in_group(group, BracketKind::WinnersBracket, 3, 1),
        MatchId::in_group(
            group,
            BracketKind::LosersBranchA,
            final_round(BracketKind::LosersBranchA),
            1,
        ),
        MatchId::in_group(group, BracketKind::WinnersBracket, 3, 2),
        MatchId::in_group(
            group,
            BracketKind::LosersBranchB,
            final_round(BracketKind::LosersBranchB),
            1,
        ),
    ]
}

/// The four Group Final matches, in `[SF1.p1, SF1.p2, SF2.p1, SF2.p2]`
/// order.
pub fn cross_bracket_sources() -> [MatchId; 4] {
    [
        MatchId::in_group(Group::A, BracketKind::GroupFinal, 1, 1),
        MatchId::in_group(Group::B, BracketKind::GroupFinal, 1, 1),
        MatchId::in_group(Group::A, BracketKind::GroupFinal, 1, 2),
        MatchId::in_group(Group::B, BracketKind::GroupFinal, 1, 2),
    ]
}
