//! # Bracket Coordinates
//!
//! Every match in a SABO-32 tournament is addressed by a coordinate
//! `(group, bracket, round, slot)`. The coordinate doubles as the match key,
//! so two records describing the same position cannot coexist.
//!
//! ## Textual Form
//!
//! ```text
//! A-WB-R1-M3     Group A, Winners Bracket, round 1, slot 3
//! B-LA-R2-M1     Group B, Losers Branch A, round 2, slot 1
//! X-SF-R1-M2     cross stage (no group), semifinal slot 2
//! ```
//!
//! Parsing only checks the syntax. Whether a coordinate exists in the fixed
//! 32-player format is answered by the topology table in `sabo-bracket`.
//!
//! ## Why Not Round Numbers
//!
//! Legacy records namespaced brackets into round numbers (101 for the first
//! losers-branch round, 250 for a group final). Here the bracket is a closed
//! enum and `round` always starts at 1 inside it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SaboError;

// ─── Group ───────────────────────────────────────────────────────────

/// One of the two 16-player halves of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    /// First group (entrants seeded 1–16).
    A,
    /// Second group (entrants seeded 17–32).
    B,
}

impl Group {
    /// Both groups in canonical order.
    pub const ALL: [Group; 2] = [Group::A, Group::B];

    /// Single-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = SaboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(SaboError::InvalidIdentifier(format!(
                "unknown group: {other:?}"
            ))),
        }
    }
}

// ─── Bracket Kind ────────────────────────────────────────────────────

/// The bracket a match belongs to.
///
/// | Code | Bracket         | Stage        |
/// |------|-----------------|--------------|
/// | WB   | Winners Bracket | group        |
/// | LA   | Losers Branch A | group        |
/// | LB   | Losers Branch B | group        |
/// | GF   | Group Final     | group        |
/// | SF   | Cross Semifinal | cross        |
/// | CF   | Cross Final     | cross        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketKind {
    /// Entrants stay here until their first loss.
    WinnersBracket,
    /// Single-elimination chain fed by Winners Bracket round 1 losers.
    LosersBranchA,
    /// Single-elimination chain fed by Winners Bracket round 2 losers.
    LosersBranchB,
    /// The two matches deciding a group's cross-bracket representatives.
    GroupFinal,
    /// Cross-group semifinals.
    CrossSemifinal,
    /// The championship match.
    CrossFinal,
}

impl BracketKind {
    /// All bracket kinds in play order.
    pub const ALL: [BracketKind; 6] = [
        BracketKind::WinnersBracket,
        BracketKind::LosersBranchA,
        BracketKind::LosersBranchB,
        BracketKind::GroupFinal,
        BracketKind::CrossSemifinal,
        BracketKind::CrossFinal,
    ];

    /// Two-letter code used in match keys.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WinnersBracket => "WB",
            Self::LosersBranchA => "LA",
            Self::LosersBranchB => "LB",
            Self::GroupFinal => "GF",
            Self::CrossSemifinal => "SF",
            Self::CrossFinal => "CF",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WinnersBracket => "Winners Bracket",
            Self::LosersBranchA => "Losers Branch A",
            Self::LosersBranchB => "Losers Branch B",
            Self::GroupFinal => "Group Final",
            Self::CrossSemifinal => "Cross Semifinal",
            Self::CrossFinal => "Cross Final",
        }
    }

    /// Parse a two-letter code.
    pub fn from_code(code: &str) -> Result<Self, SaboError> {
        match code {
            "WB" => Ok(Self::WinnersBracket),
            "LA" => Ok(Self::LosersBranchA),
            "LB" => Ok(Self::LosersBranchB),
            "GF" => Ok(Self::GroupFinal),
            "SF" => Ok(Self::CrossSemifinal),
            "CF" => Ok(Self::CrossFinal),
            other => Err(SaboError::InvalidIdentifier(format!(
                "unknown bracket code: {other:?}"
            ))),
        }
    }

    /// Whether matches of this kind belong to a group (as opposed to the
    /// cross stage).
    pub fn is_group_stage(&self) -> bool {
        !matches!(self, Self::CrossSemifinal | Self::CrossFinal)
    }

    /// Whether losing a match of this kind sends the loser somewhere else.
    ///
    /// Only Winners Bracket losses are survivable.
    pub fn has_loser_feed(&self) -> bool {
        matches!(self, Self::WinnersBracket)
    }
}

impl std::fmt::Display for BracketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Match Id ────────────────────────────────────────────────────────

/// Coordinate (and key) of one match.
///
/// `group` is `None` only for cross-stage matches. Construction does not
/// consult the topology; a syntactically valid id may still be rejected by
/// the engine as an unknown coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId {
    /// Owning group, `None` for the cross stage.
    pub group: Option<Group>,
    /// Bracket within the group (or cross stage).
    pub bracket: BracketKind,
    /// 1-based round within the bracket.
    pub round: u8,
    /// 1-based position within the round.
    pub slot: u8,
}

impl MatchId {
    /// A match inside one group.
    pub const fn in_group(group: Group, bracket: BracketKind, round: u8, slot: u8) -> Self {
        Self {
            group: Some(group),
            bracket,
            round,
            slot,
        }
    }

    /// A cross-stage match.
    pub const fn cross(bracket: BracketKind, round: u8, slot: u8) -> Self {
        Self {
            group: None,
            bracket,
            round,
            slot,
        }
    }

    /// Position inside the destination match: odd slots feed `player1`,
    /// even slots feed `player2`.
    pub fn feed_position(&self) -> SlotPosition {
        if self.slot % 2 == 1 {
            SlotPosition::Player1
        } else {
            SlotPosition::Player2
        }
    }

    /// Slot index of the destination match in a halving round
    /// (`ceil(slot / 2)`).
    pub fn feed_slot(&self) -> u8 {
        self.slot.div_ceil(2)
    }

    /// Reference to one player position of this match.
    pub fn slot_ref(self, position: SlotPosition) -> SlotRef {
        SlotRef {
            match_id: self,
            position,
        }
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let group = self.group.map(|g| g.as_str()).unwrap_or("X");
        write!(
            f,
            "{group}-{}-R{}-M{}",
            self.bracket.code(),
            self.round,
            self.slot
        )
    }
}

impl FromStr for MatchId {
    type Err = SaboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SaboError::InvalidIdentifier(format!("malformed match id: {s:?}"));

        let parts: Vec<&str> = s.trim().split('-').collect();
        let [group, bracket, round, slot] = parts.as_slice() else {
            return Err(invalid());
        };

        let group = match *group {
            "X" => None,
            g => Some(g.parse::<Group>()?),
        };
        let bracket = BracketKind::from_code(bracket)?;
        let round = round
            .strip_prefix('R')
            .and_then(|r| r.parse::<u8>().ok())
            .filter(|r| *r > 0)
            .ok_or_else(invalid)?;
        let slot = slot
            .strip_prefix('M')
            .and_then(|m| m.parse::<u8>().ok())
            .filter(|m| *m > 0)
            .ok_or_else(invalid)?;

        Ok(Self {
            group,
            bracket,
            round,
            slot,
        })
    }
}

impl TryFrom<String> for MatchId {
    type Error = SaboError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchId> for String {
    fn from(id: MatchId) -> Self {
        id.to_string()
    }
}

// ─── Slots ───────────────────────────────────────────────────────────

/// One of the two player positions of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPosition {
    /// First player position.
    Player1,
    /// Second player position.
    Player2,
}

impl SlotPosition {
    /// Both positions in order.
    pub const BOTH: [SlotPosition; 2] = [SlotPosition::Player1, SlotPosition::Player2];

    /// The opposite position.
    pub fn other(&self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }

    /// Short label (`p1` / `p2`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player1 => "p1",
            Self::Player2 => "p2",
        }
    }
}

impl std::fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single player position of a single match: the unit a result is
/// written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotRef {
    /// The match holding the slot.
    pub match_id: MatchId,
    /// Which of the two positions.
    pub position: SlotPosition,
}

impl std::fmt::Display for SlotRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.match_id, self.position)
    }
}
