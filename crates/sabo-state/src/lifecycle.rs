//! # Match State Machine
//!
//! Runtime-checked lifecycle for a single match record. The record is what
//! the Match Store persists; every mutation goes through [`Match::place()`]
//! or [`Match::complete()`], which validate the transition and append to the
//! per-match transition log.
//!
//! ## Allowed Transitions
//!
//! | From            | To              | Trigger                        |
//! |-----------------|-----------------|--------------------------------|
//! | Empty           | AwaitingPlayers | first player placed            |
//! | AwaitingPlayers | Ready           | second player placed           |
//! | Ready           | Completed       | result recorded                |
//!
//! Placement fills one slot per call, so there is no `Empty → Ready`
//! edge; seeding a match logs two transitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabo_core::{EntrantId, MatchId, SlotPosition, Timestamp};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// No players assigned yet.
    Empty,
    /// Exactly one player slot filled.
    AwaitingPlayers,
    /// Both players assigned, not yet played.
    Ready,
    /// Winner recorded (terminal).
    Completed,
}

impl MatchStatus {
    /// Canonical state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::AwaitingPlayers => "AWAITING_PLAYERS",
            Self::Ready => "READY",
            Self::Completed => "COMPLETED",
        }
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [MatchStatus] {
        match self {
            Self::Empty => &[Self::AwaitingPlayers],
            Self::AwaitingPlayers => &[Self::Ready],
            Self::Ready => &[Self::Completed],
            Self::Completed => &[],
        }
    }

    /// Whether `to` is reachable from `self` in one step.
    pub fn can_transition_to(&self, to: MatchStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Status implied by the number of occupied player slots of an
    /// undecided match.
    pub fn from_occupancy(filled: usize) -> Self {
        match filled {
            0 => Self::Empty,
            1 => Self::AwaitingPlayers,
            _ => Self::Ready,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Score ───────────────────────────────────────────────────────────

/// Racks won by each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    /// Racks won by `player1`.
    pub player1: u16,
    /// Racks won by `player2`.
    pub player2: u16,
}

impl Score {
    /// Construct a score.
    pub fn new(player1: u16, player2: u16) -> Self {
        Self { player1, player2 }
    }

    /// Position holding the strictly higher score, `None` on a tie.
    pub fn leader(&self) -> Option<SlotPosition> {
        match self.player1.cmp(&self.player2) {
            std::cmp::Ordering::Greater => Some(SlotPosition::Player1),
            std::cmp::Ordering::Less => Some(SlotPosition::Player2),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.player1, self.player2)
    }
}

impl std::str::FromStr for Score {
    type Err = String;

    /// Parse `"7-3"` or `"7:3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(['-', ':'])
            .ok_or_else(|| format!("score must look like 7-3, got {s:?}"))?;
        let a = a.trim().parse::<u16>().map_err(|e| format!("{a:?}: {e}"))?;
        let b = b.trim().parse::<u16>().map_err(|e| format!("{b:?}: {e}"))?;
        Ok(Self::new(a, b))
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// One edge of a match's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTransition {
    /// State before.
    pub from: MatchStatus,
    /// State after.
    pub to: MatchStatus,
    /// When it happened.
    pub at: Timestamp,
    /// What caused it.
    pub reason: String,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Rejections raised by the match state machine. None of them mutate the
/// record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A result was submitted for a match that is not `Ready`.
    #[error("match {match_id} is {status}, not READY")]
    NotReady {
        /// The match.
        match_id: MatchId,
        /// Its current state.
        status: MatchStatus,
    },

    /// The declared winner is not one of the two players.
    #[error("{entrant} is not a participant of {match_id}")]
    NotParticipant {
        /// The match.
        match_id: MatchId,
        /// The declared winner.
        entrant: EntrantId,
    },

    /// The submitted score does not single out the declared winner.
    #[error("score {score} does not make {winner} the winner of {match_id}")]
    ScoreMismatch {
        /// The match.
        match_id: MatchId,
        /// The declared winner.
        winner: EntrantId,
        /// The submitted score.
        score: Score,
    },

    /// A tied score names no winner.
    #[error("score {score} for {match_id} is tied")]
    TiedScore {
        /// The match.
        match_id: MatchId,
        /// The submitted score.
        score: Score,
    },

    /// The slot already holds a different entrant.
    #[error("{match_id}.{position} already holds {occupant}, refusing {incoming}")]
    SlotOccupied {
        /// The match.
        match_id: MatchId,
        /// The contested position.
        position: SlotPosition,
        /// Who is there.
        occupant: EntrantId,
        /// Who was refused.
        incoming: EntrantId,
    },

    /// The entrant already holds the other slot of the same match.
    #[error("{entrant} already plays in {match_id}")]
    DuplicateEntrant {
        /// The match.
        match_id: MatchId,
        /// The entrant.
        entrant: EntrantId,
    },

    /// Placement attempted on a finished match.
    #[error("match {match_id} is already completed")]
    AlreadyCompleted {
        /// The match.
        match_id: MatchId,
    },

    /// A loaded record violates the lifecycle invariants.
    #[error("match {match_id} is inconsistent: {detail}")]
    Inconsistent {
        /// The match.
        match_id: MatchId,
        /// What is wrong.
        detail: String,
    },
}

// ─── The Match ───────────────────────────────────────────────────────

/// Result of a successful [`Match::place()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The entrant was written; the match is now in the given state.
    Placed(MatchStatus),
    /// The entrant already held that slot. Nothing changed.
    AlreadyPresent,
}

/// A match record.
///
/// Fields are private so that `winner`, `loser`, and `status` can only
/// change together. Read access goes through the getters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    id: MatchId,
    player1: Option<EntrantId>,
    player2: Option<EntrantId>,
    winner: Option<EntrantId>,
    loser: Option<EntrantId>,
    score: Option<Score>,
    status: MatchStatus,
    updated_at: Option<Timestamp>,
    #[serde(default)]
    transition_log: Vec<MatchTransition>,
}

impl Match {
    /// A fresh match with no players.
    pub fn new(id: MatchId) -> Self {
        Self {
            id,
            player1: None,
            player2: None,
            winner: None,
            loser: None,
            score: None,
            status: MatchStatus::Empty,
            updated_at: None,
            transition_log: Vec::new(),
        }
    }

    /// Coordinate of this match.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Current lifecycle state.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Occupant of one position.
    pub fn player(&self, position: SlotPosition) -> Option<&EntrantId> {
        match position {
            SlotPosition::Player1 => self.player1.as_ref(),
            SlotPosition::Player2 => self.player2.as_ref(),
        }
    }

    /// `player1`.
    pub fn player1(&self) -> Option<&EntrantId> {
        self.player1.as_ref()
    }

    /// `player2`.
    pub fn player2(&self) -> Option<&EntrantId> {
        self.player2.as_ref()
    }

    /// Winner, once completed.
    pub fn winner(&self) -> Option<&EntrantId> {
        self.winner.as_ref()
    }

    /// Loser, once completed.
    pub fn loser(&self) -> Option<&EntrantId> {
        self.loser.as_ref()
    }

    /// Score, if one was submitted with the result.
    pub fn score(&self) -> Option<Score> {
        self.score
    }

    /// Time of the last mutation.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Lifecycle edges taken so far.
    pub fn transition_log(&self) -> &[MatchTransition] {
        &self.transition_log
    }

    /// Both players present and no result yet.
    pub fn is_playable(&self) -> bool {
        self.status == MatchStatus::Ready
    }

    /// Result recorded.
    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Which position the entrant holds, if any.
    pub fn position_of(&self, entrant: &EntrantId) -> Option<SlotPosition> {
        SlotPosition::BOTH
            .into_iter()
            .find(|p| self.player(*p) == Some(entrant))
    }

    /// Number of occupied player slots.
    pub fn filled_slots(&self) -> usize {
        usize::from(self.player1.is_some()) + usize::from(self.player2.is_some())
    }

    /// Place an entrant into one position.
    ///
    /// Placing the entrant who already holds that position returns
    /// [`Placement::AlreadyPresent`] without touching the record, even on a
    /// completed match, so replays of the same advancement are harmless.
    pub fn place(
        &mut self,
        position: SlotPosition,
        entrant: EntrantId,
    ) -> Result<Placement, MatchError> {
        if let Some(occupant) = self.player(position) {
            if *occupant == entrant {
                return Ok(Placement::AlreadyPresent);
            }
            return Err(MatchError::SlotOccupied {
                match_id: self.id,
                position,
                occupant: occupant.clone(),
                incoming: entrant,
            });
        }
        if self.status.is_terminal() {
            return Err(MatchError::AlreadyCompleted { match_id: self.id });
        }
        if self.player(position.other()) == Some(&entrant) {
            return Err(MatchError::DuplicateEntrant {
                match_id: self.id,
                entrant,
            });
        }

        let reason = format!("{entrant} placed in {position}");
        match position {
            SlotPosition::Player1 => self.player1 = Some(entrant),
            SlotPosition::Player2 => self.player2 = Some(entrant),
        }
        let next = MatchStatus::from_occupancy(self.filled_slots());
        self.move_to(next, reason);
        Ok(Placement::Placed(self.status))
    }

    /// Record the result. Returns the loser.
    ///
    /// When a score is given, the winner must hold the strictly higher
    /// value. On any rejection the record is unchanged.
    pub fn complete(
        &mut self,
        winner: &EntrantId,
        score: Option<Score>,
    ) -> Result<EntrantId, MatchError> {
        if self.status != MatchStatus::Ready {
            return Err(MatchError::NotReady {
                match_id: self.id,
                status: self.status,
            });
        }
        let Some(winner_pos) = self.position_of(winner) else {
            return Err(MatchError::NotParticipant {
                match_id: self.id,
                entrant: winner.clone(),
            });
        };
        if let Some(score) = score {
            let Some(leader) = score.leader() else {
                return Err(MatchError::TiedScore {
                    match_id: self.id,
                    score,
                });
            };
            if leader != winner_pos {
                return Err(MatchError::ScoreMismatch {
                    match_id: self.id,
                    winner: winner.clone(),
                    score,
                });
            }
        }
        let loser = self
            .player(winner_pos.other())
            .cloned()
            .ok_or_else(|| MatchError::Inconsistent {
                match_id: self.id,
                detail: "READY match with an empty slot".to_string(),
            })?;

        self.winner = Some(winner.clone());
        self.loser = Some(loser.clone());
        self.score = score;
        self.move_to(MatchStatus::Completed, format!("{winner} beat {loser}"));
        Ok(loser)
    }

    /// Check that a record loaded from storage obeys the lifecycle
    /// invariants.
    pub fn validate(&self) -> Result<(), MatchError> {
        let inconsistent = |detail: &str| MatchError::Inconsistent {
            match_id: self.id,
            detail: detail.to_string(),
        };

        if self.player1.is_some() && self.player1 == self.player2 {
            return Err(inconsistent("same entrant in both slots"));
        }
        match self.status {
            MatchStatus::Completed => {
                let (Some(w), Some(l)) = (&self.winner, &self.loser) else {
                    return Err(inconsistent("COMPLETED without winner and loser"));
                };
                if w == l {
                    return Err(inconsistent("winner equals loser"));
                }
                if self.position_of(w).is_none() || self.position_of(l).is_none() {
                    return Err(inconsistent("winner/loser are not the two players"));
                }
                if let Some(score) = self.score {
                    if score.leader() != self.position_of(w) {
                        return Err(inconsistent("score does not match winner"));
                    }
                }
            }
            status => {
                if self.winner.is_some() || self.loser.is_some() {
                    return Err(inconsistent("result recorded on an undecided match"));
                }
                if status != MatchStatus::from_occupancy(self.filled_slots()) {
                    return Err(inconsistent("status does not match slot occupancy"));
                }
            }
        }
        Ok(())
    }

    fn move_to(&mut self, to: MatchStatus, reason: String) {
        let now = Timestamp::now();
        if to != self.status {
            self.transition_log.push(MatchTransition {
                from: self.status,
                to,
                at: now,
                reason,
            });
            self.status = to;
        }
        self.updated_at = Some(now);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
