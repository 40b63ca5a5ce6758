//! # Advancement Event Log
//!
//! Append-only record of everything the engine did, in the order it did
//! it. Each event carries the digest of its predecessor, and its own
//! digest is SHA-256 over the canonical form of
//! `{sequence, at, kind, prev_digest}`. Editing, dropping, or reordering
//! a persisted event breaks the chain and [`EventLog::verify_chain()`]
//! reports where.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabo_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, EntrantId, MatchId,
    SlotRef, Timestamp,
};
use sabo_state::Score;

use crate::resolver::StageResolution;
use crate::topology::Delivery;

/// Chain verification failures.
#[derive(Error, Debug)]
pub enum EventLogError {
    /// Sequence numbers are not `0, 1, 2, ...`.
    #[error("event sequence gap: expected #{expected}, found #{actual}")]
    SequenceMismatch {
        /// Expected sequence number.
        expected: u64,
        /// Sequence number found.
        actual: u64,
    },

    /// An event does not point at its predecessor.
    #[error("event #{sequence} does not link to its predecessor")]
    BrokenLink {
        /// The offending event.
        sequence: u64,
    },

    /// An event's content does not match its digest.
    #[error("event #{sequence} was modified after it was written")]
    DigestMismatch {
        /// The offending event.
        sequence: u64,
    },

    /// Canonicalization failed while recomputing a digest.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Round 1 of both Winners Brackets was filled.
    TournamentSeeded {
        /// Number of entrants placed.
        entrants: usize,
    },
    /// A result was recorded.
    MatchCompleted {
        /// The match.
        match_id: MatchId,
        /// Who won.
        winner: EntrantId,
        /// Who lost.
        loser: EntrantId,
        /// Submitted score, if any.
        score: Option<Score>,
    },
    /// An entrant was written into a downstream slot.
    PlayerPlaced {
        /// Destination slot.
        slot: SlotRef,
        /// Who was placed.
        entrant: EntrantId,
        /// Which step wrote it.
        delivery: Delivery,
    },
    /// A resolver opened the next stage.
    StageResolved {
        /// Which stage.
        stage: StageResolution,
    },
    /// The Cross Final was decided.
    ChampionCrowned {
        /// The champion.
        entrant: EntrantId,
    },
    /// A placement was refused because the slot held someone else.
    PlacementFailed {
        /// Destination slot.
        slot: SlotRef,
        /// Current holder.
        occupant: EntrantId,
        /// Who was refused.
        incoming: EntrantId,
    },
    /// A stuck slot was filled by a repair run.
    SlotRepaired {
        /// Destination slot.
        slot: SlotRef,
        /// Who was placed.
        entrant: EntrantId,
    },
}

/// One link of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementEvent {
    /// Position in the log, from 0.
    pub sequence: u64,
    /// When it was appended.
    pub at: Timestamp,
    /// What happened.
    pub kind: EventKind,
    /// Digest of the previous event, `None` for the first.
    pub prev_digest: Option<ContentDigest>,
    /// Digest of this event.
    pub digest: ContentDigest,
}

fn event_digest(
    sequence: u64,
    at: &Timestamp,
    kind: &EventKind,
    prev_digest: &Option<ContentDigest>,
) -> Result<ContentDigest, CanonicalizationError> {
    let body = serde_json::json!({
        "sequence": sequence,
        "at": at,
        "kind": kind,
        "prev_digest": prev_digest,
    });
    Ok(sha256_digest(&CanonicalBytes::new(&body)?))
}

/// Check a persisted event list link by link.
pub fn verify_chain(events: &[AdvancementEvent]) -> Result<(), EventLogError> {
    let mut prev: Option<ContentDigest> = None;
    for (i, ev) in events.iter().enumerate() {
        let expected = i as u64;
        if ev.sequence != expected {
            return Err(EventLogError::SequenceMismatch {
                expected,
                actual: ev.sequence,
            });
        }
        if ev.prev_digest != prev {
            return Err(EventLogError::BrokenLink {
                sequence: ev.sequence,
            });
        }
        if event_digest(ev.sequence, &ev.at, &ev.kind, &ev.prev_digest)? != ev.digest {
            return Err(EventLogError::DigestMismatch {
                sequence: ev.sequence,
            });
        }
        prev = Some(ev.digest);
    }
    Ok(())
}

/// Thread-safe append-only event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<AdvancementEvent>>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a persisted log. The chain is verified first.
    pub fn from_events(events: Vec<AdvancementEvent>) -> Result<Self, EventLogError> {
        verify_chain(&events)?;
        Ok(Self {
            events: Mutex::new(events),
        })
    }

    /// Append an event and return it.
    pub fn append(&self, kind: EventKind) -> Result<AdvancementEvent, CanonicalizationError> {
        let mut appended = self.append_all(vec![kind])?;
        Ok(appended.remove(0))
    }

    /// Append several events as one contiguous run.
    ///
    /// Nothing is appended if any of them fails to canonicalize.
    pub fn append_all(
        &self,
        kinds: Vec<EventKind>,
    ) -> Result<Vec<AdvancementEvent>, CanonicalizationError> {
        let mut events = self.events.lock();
        let mut sequence = events.len() as u64;
        let mut prev_digest = events.last().map(|e| e.digest);
        let mut batch = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let at = Timestamp::now();
            let digest = event_digest(sequence, &at, &kind, &prev_digest)?;
            batch.push(AdvancementEvent {
                sequence,
                at,
                kind,
                prev_digest,
                digest,
            });
            sequence += 1;
            prev_digest = Some(digest);
        }
        events.extend(batch.iter().cloned());
        Ok(batch)
    }

    /// Copy of every event.
    pub fn events(&self) -> Vec<AdvancementEvent> {
        self.events.lock().clone()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been logged yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digest of the latest event.
    pub fn head(&self) -> Option<ContentDigest> {
        self.events.lock().last().map(|e| e.digest)
    }

    /// Recheck the whole chain.
    pub fn verify_chain(&self) -> Result<(), EventLogError> {
        verify_chain(&self.events.lock())
    }

    /// Human-readable narrative, one line per recorded result.
    pub fn render(&self) -> Vec<String> {
        render(&self.events.lock())
    }
}

/// Render events as lines of the form
/// `match X completed → winner placed in Y, loser placed in Z → stage W resolved`.
pub fn render(events: &[AdvancementEvent]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for ev in events {
        match &ev.kind {
            EventKind::TournamentSeeded { entrants } => {
                line.flush(&mut lines);
                lines.push(format!("tournament seeded with {entrants} entrants"));
            }
            EventKind::MatchCompleted {
                match_id,
                winner,
                loser,
                score,
            } => {
                line.flush(&mut lines);
                let score = score.map(|s| format!(" {s}")).unwrap_or_default();
                line.open(
                    format!("match {match_id} completed ({winner} beat {loser}{score})"),
                    winner.clone(),
                    loser.clone(),
                );
            }
            EventKind::PlayerPlaced { slot, entrant, .. } => {
                let who = line.role_of(entrant);
                line.placement(format!("{who} placed in {slot}"));
            }
            EventKind::StageResolved { stage } => {
                line.segment(format!("stage {stage} resolved"));
            }
            EventKind::ChampionCrowned { entrant } => {
                line.segment(format!("{entrant} is champion"));
            }
            EventKind::PlacementFailed {
                slot,
                occupant,
                incoming,
            } => {
                line.segment(format!(
                    "placing {incoming} in {slot} FAILED ({occupant} already there)"
                ));
            }
            EventKind::SlotRepaired { slot, entrant } => {
                line.flush(&mut lines);
                lines.push(format!("repair: {entrant} placed in {slot}"));
            }
        }
    }
    line.flush(&mut lines);
    lines
}

#[derive(Default)]
struct Line {
    segments: Vec<String>,
    in_placements: bool,
    winner: Option<EntrantId>,
    loser: Option<EntrantId>,
}

impl Line {
    fn open(&mut self, head: String, winner: EntrantId, loser: EntrantId) {
        self.segments.push(head);
        self.winner = Some(winner);
        self.loser = Some(loser);
    }

    fn role_of(&self, entrant: &EntrantId) -> String {
        if self.winner.as_ref() == Some(entrant) {
            "winner".to_string()
        } else if self.loser.as_ref() == Some(entrant) {
            "loser".to_string()
        } else {
            entrant.to_string()
        }
    }

    fn placement(&mut self, text: String) {
        match self.segments.last_mut() {
            Some(last) if self.in_placements => {
                last.push_str(", ");
                last.push_str(&text);
            }
            _ => self.segments.push(text),
        }
        self.in_placements = true;
    }

    fn segment(&mut self, text: String) {
        self.segments.push(text);
        self.in_placements = false;
    }

    fn flush(&mut self, lines: &mut Vec<String>) {
        if !self.segments.is_empty() {
            lines.push(self.segments.join(" → "));
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabo_core::{BracketKind, Group, SlotPosition};

    fn e(s: &str) -> EntrantId {
        EntrantId::new(s).unwrap()
    }

    fn wb1() -> MatchId {
        MatchId::in_group(Group::A, BracketKind::WinnersBracket, 1, 1)
    }

    fn completed() -> EventKind {
        EventKind::MatchCompleted {
            match_id: wb1(),
            winner: e("p01"),
            loser: e("p02"),
            score: None,
        }
    }

    fn placed(slot: &str, entrant: &str) -> EventKind {
        let (id, pos) = slot.split_once('.').unwrap();
        let position = if pos == "p1" {
            SlotPosition::Player1
        } else {
            SlotPosition::Player2
        };
        EventKind::PlayerPlaced {
            slot: id.parse::<MatchId>().unwrap().slot_ref(position),
            entrant: e(entrant),
            delivery: Delivery::Direct,
        }
    }

    #[test]
    fn append_links_digests() {
        let log = EventLog::new();
        let first = log.append(completed()).unwrap();
        let second = log.append(placed("A-WB-R2-M1.p1", "p01")).unwrap();
        assert_eq!(first.sequence, 0);
        assert!(first.prev_digest.is_none());
        assert_eq!(second.prev_digest, Some(first.digest));
        assert_eq!(log.head(), Some(second.digest));
        log.verify_chain().unwrap();
    }

    #[test]
    fn batches_from_many_threads_stay_contiguous() {
        let log = EventLog::new();
        std::thread::scope(|scope| {
            for t in 0..8 {
                let log = &log;
                scope.spawn(move || {
                    let who = format!("t{t}");
                    for _ in 0..10 {
                        log.append_all(vec![
                            placed("A-WB-R2-M1.p1", &who),
                            placed("A-WB-R2-M1.p2", &who),
                            placed("A-LA-R1-M1.p1", &who),
                        ])
                        .unwrap();
                    }
                });
            }
        });

        let events = log.events();
        assert_eq!(events.len(), 240);
        for run in events.chunks(3) {
            let owners: Vec<&EntrantId> = run
                .iter()
                .map(|ev| match &ev.kind {
                    EventKind::PlayerPlaced { entrant, .. } => entrant,
                    other => panic!("unexpected {other:?}"),
                })
                .collect();
            assert!(owners.iter().all(|o| *o == owners[0]), "{owners:?}");
        }
        log.verify_chain().unwrap();
    }

    #[test]
    fn edited_event_is_detected() {
        let log = EventLog::new();
        log.append(completed()).unwrap();
        log.append(placed("A-WB-R2-M1.p1", "p01")).unwrap();
        let mut events = log.events();
        events[0].kind = EventKind::MatchCompleted {
            match_id: wb1(),
            winner: e("p02"),
            loser: e("p01"),
            score: None,
        };
        assert!(matches!(
            verify_chain(&events),
            Err(EventLogError::DigestMismatch { sequence: 0 })
        ));
    }

    #[test]
    fn dropped_event_is_detected() {
        let log = EventLog::new();
        for _ in 0..3 {
            log.append(completed()).unwrap();
        }
        let mut events = log.events();
        events.remove(1);
        assert!(matches!(
            verify_chain(&events),
            Err(EventLogError::SequenceMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn from_events_refuses_broken_chain() {
        let log = EventLog::new();
        log.append(completed()).unwrap();
        log.append(completed()).unwrap();
        let mut events = log.events();
        events[1].prev_digest = None;
        assert!(EventLog::from_events(events).is_err());

        let resumed = EventLog::from_events(log.events()).unwrap();
        resumed.append(completed()).unwrap();
        resumed.verify_chain().unwrap();
        assert_eq!(resumed.len(), 3);
    }

    #[test]
    fn persisted_events_roundtrip_through_json() {
        let log = EventLog::new();
        log.append(completed()).unwrap();
        log.append(EventKind::StageResolved {
            stage: StageResolution::GroupFinal(Group::B),
        })
        .unwrap();
        let json = serde_json::to_string(&log.events()).unwrap();
        let back: Vec<AdvancementEvent> = serde_json::from_str(&json).unwrap();
        verify_chain(&back).unwrap();
    }

    #[test]
    fn render_joins_placements_and_stages() {
        let log = EventLog::new();
        log.append(completed()).unwrap();
        log.append(placed("A-WB-R2-M1.p1", "p01")).unwrap();
        log.append(placed("A-LA-R1-M1.p1", "p02")).unwrap();
        log.append(EventKind::StageResolved {
            stage: StageResolution::GroupFinal(Group::A),
        })
        .unwrap();
        log.append(placed("A-GF-R1-M1.p2", "p09")).unwrap();

        let lines = log.render();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "match A-WB-R1-M1 completed (p01 beat p02) → winner placed in A-WB-R2-M1.p1, \
             loser placed in A-LA-R1-M1.p1 → stage Group A final resolved → \
             p09 placed in A-GF-R1-M1.p2"
        );
    }

    #[test]
    fn render_starts_a_line_per_result() {
        let log = EventLog::new();
        log.append(EventKind::TournamentSeeded { entrants: 32 }).unwrap();
        log.append(completed()).unwrap();
        log.append(completed()).unwrap();
        log.append(EventKind::SlotRepaired {
            slot: wb1().slot_ref(SlotPosition::Player1),
            entrant: e("p01"),
        })
        .unwrap();
        let lines = log.render();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "tournament seeded with 32 entrants");
        assert!(lines[3].starts_with("repair: p01"));
    }
}
