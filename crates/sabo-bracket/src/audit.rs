//! # Audit and Repair
//!
//! [`audit()`] checks stored records against the topology and reports
//! anything that would leave a tournament stuck: missing or unknown rows,
//! results that never reached their destination, slots holding the wrong
//! entrant, status drift, and entrants booked into two open matches.
//!
//! [`repair()`] fills the slots a completed source should already have
//! filled, then re-runs both resolvers. It only writes into empty slots;
//! anything that would need an overwrite stays in the report for a human.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use sabo_core::{EntrantId, Group, MatchId, SlotRef};
use sabo_state::Match;

use crate::engine::AdvancementEngine;
use crate::error::AdvanceError;
use crate::events::EventKind;
use crate::resolver::{SlotFill, StageResolution};
use crate::store::{MatchStore, SetPlayer};
use crate::topology::{self, Delivery, Destination};

/// One problem found by [`audit()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    /// The topology expects this match but the store has no row.
    MissingMatch {
        /// The absent match.
        match_id: MatchId,
    },
    /// The store holds a row the topology does not know.
    UnexpectedMatch {
        /// The stray row.
        match_id: MatchId,
    },
    /// A completed source never delivered to its destination.
    StuckAdvancement {
        /// The completed match.
        source: MatchId,
        /// The empty destination.
        slot: SlotRef,
        /// Who should be there.
        entrant: EntrantId,
        /// Who should have written it.
        delivery: Delivery,
    },
    /// A destination holds someone other than its source produced.
    WrongOccupant {
        /// The completed match.
        source: MatchId,
        /// The destination.
        slot: SlotRef,
        /// Who should be there.
        expected: EntrantId,
        /// Who is there.
        found: EntrantId,
    },
    /// A record violates the lifecycle invariants.
    StatusMismatch {
        /// The record.
        match_id: MatchId,
        /// What is wrong.
        detail: String,
    },
    /// An entrant sits in more than one undecided match.
    DuplicateEntrant {
        /// The entrant.
        entrant: EntrantId,
        /// The open matches holding them.
        matches: Vec<MatchId>,
    },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMatch { match_id } => write!(f, "missing match {match_id}"),
            Self::UnexpectedMatch { match_id } => write!(f, "unexpected match {match_id}"),
            Self::StuckAdvancement {
                source,
                slot,
                entrant,
                ..
            } => write!(f, "{source} completed but {entrant} never reached {slot}"),
            Self::WrongOccupant {
                source,
                slot,
                expected,
                found,
            } => write!(f, "{slot} holds {found}, {source} says {expected}"),
            Self::StatusMismatch { match_id, detail } => write!(f, "{match_id}: {detail}"),
            Self::DuplicateEntrant { entrant, matches } => {
                let ids: Vec<String> = matches.iter().map(ToString::to_string).collect();
                write!(f, "{entrant} is booked into {}", ids.join(", "))
            }
        }
    }
}

/// Everything [`audit()`] found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Rows inspected.
    pub checked: usize,
    /// Problems, in discovery order.
    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// No problems.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Check every stored record against the topology.
pub fn audit<S: MatchStore + ?Sized>(store: &S) -> AuditReport {
    let rows: BTreeMap<MatchId, Match> = store.all().into_iter().map(|m| (m.id(), m)).collect();
    let mut findings = Vec::new();

    let expected: BTreeSet<MatchId> = topology::all_matches().into_iter().collect();
    for id in &expected {
        if !rows.contains_key(id) {
            findings.push(Finding::MissingMatch { match_id: *id });
        }
    }
    for id in rows.keys() {
        if !expected.contains(id) {
            findings.push(Finding::UnexpectedMatch { match_id: *id });
        }
    }

    for m in rows.values() {
        if let Err(e) = m.validate() {
            findings.push(Finding::StatusMismatch {
                match_id: m.id(),
                detail: e.to_string(),
            });
        }
    }

    for (id, m) in rows.iter().filter(|(id, _)| expected.contains(*id)) {
        if !m.is_completed() {
            continue;
        }
        let Ok(dest) = topology::destination_of(id) else {
            continue;
        };
        let edges = [
            dest.winner.zip(m.winner().cloned()),
            dest.loser.zip(m.loser().cloned()),
        ];
        for (d, entrant) in edges.into_iter().flatten() {
            if !due(&rows, &d) {
                continue;
            }
            let Some(target) = rows.get(&d.slot.match_id) else {
                continue;
            };
            match target.player(d.slot.position) {
                None => findings.push(Finding::StuckAdvancement {
                    source: *id,
                    slot: d.slot,
                    entrant,
                    delivery: d.delivery,
                }),
                Some(found) if *found != entrant => findings.push(Finding::WrongOccupant {
                    source: *id,
                    slot: d.slot,
                    expected: entrant,
                    found: found.clone(),
                }),
                Some(_) => {}
            }
        }
    }

    let mut open_by_entrant: BTreeMap<&EntrantId, Vec<MatchId>> = BTreeMap::new();
    for m in rows.values().filter(|m| !m.is_completed()) {
        for e in [m.player1(), m.player2()].into_iter().flatten() {
            open_by_entrant.entry(e).or_default().push(m.id());
        }
    }
    for (entrant, matches) in open_by_entrant {
        if matches.len() > 1 {
            findings.push(Finding::DuplicateEntrant {
                entrant: entrant.clone(),
                matches,
            });
        }
    }

    AuditReport {
        checked: rows.len(),
        findings,
    }
}

/// Whether a destination should already be filled: direct edges as soon
/// as the source completes, resolver edges once all four stage sources
/// are complete.
fn due(rows: &BTreeMap<MatchId, Match>, d: &Destination) -> bool {
    let sources = match d.delivery {
        Delivery::Direct => return true,
        Delivery::GroupResolver(group) => topology::group_final_sources(group),
        Delivery::CrossResolver => topology::cross_bracket_sources(),
    };
    sources
        .iter()
        .all(|id| rows.get(id).is_some_and(Match::is_completed))
}

/// What [`repair()`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Slots filled.
    pub repaired: Vec<SlotFill>,
    /// Findings left for manual reconciliation.
    pub remaining: Vec<Finding>,
}

/// Fill stuck slots and re-run the resolvers. Never overwrites.
///
/// The events for everything written are appended in one batch, even
/// when a store failure cuts the repair short.
pub fn repair<S: MatchStore>(engine: &AdvancementEngine<S>) -> Result<RepairReport, AdvanceError> {
    let mut batch = Vec::new();
    let result = repair_into(engine, &mut batch);
    engine.events().append_all(batch)?;
    result
}

fn repair_into<S: MatchStore>(
    engine: &AdvancementEngine<S>,
    batch: &mut Vec<EventKind>,
) -> Result<RepairReport, AdvanceError> {
    let before = audit(engine.store());
    let mut repaired = Vec::new();

    for finding in &before.findings {
        let Finding::StuckAdvancement {
            slot,
            entrant,
            delivery: Delivery::Direct,
            ..
        } = finding
        else {
            continue;
        };
        match engine.store().try_set_player(slot, entrant)? {
            SetPlayer::Placed(status) => {
                tracing::info!(slot = %slot, entrant = %entrant, "repaired stuck slot");
                batch.push(EventKind::SlotRepaired {
                    slot: *slot,
                    entrant: entrant.clone(),
                });
                repaired.push(SlotFill {
                    slot: *slot,
                    entrant: entrant.clone(),
                    status,
                });
            }
            SetPlayer::Unchanged => {}
            SetPlayer::Collision { occupant } => {
                tracing::warn!(slot = %slot, occupant = %occupant, "repair refused, slot taken");
            }
        }
    }

    let stages = Group::ALL
        .into_iter()
        .map(StageResolution::GroupFinal)
        .chain([StageResolution::CrossBracket]);
    for stage in stages {
        match engine.resolve(stage, batch) {
            Ok(Some(written)) => repaired.extend(written),
            Ok(None) => {}
            Err(AdvanceError::StageBlocked {
                collision, written, ..
            }) => {
                tracing::warn!(%stage, %collision, "resolver refused during repair");
                repaired.extend(written);
            }
            Err(e) => return Err(e),
        }
    }

    // Direct edges out of matches the resolvers just opened cannot be
    // stuck (those matches are not complete yet), so one audit suffices.
    let remaining = audit(engine.store()).findings;
    Ok(RepairReport {
        repaired,
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::SeedingPlan;
    use crate::store::MemoryMatchStore;
    use sabo_core::{BracketKind, SlotPosition};

    fn e(s: &str) -> EntrantId {
        EntrantId::new(s).unwrap()
    }

    fn field() -> Vec<EntrantId> {
        (1..=32).map(|i| e(&format!("p{i:02}"))).collect()
    }

    fn wb(round: u8, slot: u8) -> MatchId {
        MatchId::in_group(Group::A, BracketKind::WinnersBracket, round, slot)
    }

    /// A store whose A-WB-R1-M1 is completed but whose downstream slots
    /// were never written, as after a crash between the two updates.
    fn stuck_store() -> MemoryMatchStore {
        let store = MemoryMatchStore::new();
        for (slot, entrant) in SeedingPlan::ordered(field()).unwrap().assignments() {
            store.try_set_player(&slot, &entrant).unwrap();
        }
        store.set_result(&wb(1, 1), &e("p01"), None).unwrap();
        store
    }

    #[test]
    fn fresh_bracket_is_clean() {
        let report = audit(&MemoryMatchStore::new());
        assert!(report.is_clean(), "{:?}", report.findings);
        assert_eq!(report.checked, 55);
    }

    #[test]
    fn engine_driven_bracket_is_clean() {
        let engine = AdvancementEngine::new(MemoryMatchStore::new());
        engine.seed(&SeedingPlan::ordered(field()).unwrap()).unwrap();
        engine.record_result(&wb(1, 1), &e("p01")).unwrap();
        assert!(audit(engine.store()).is_clean());
    }

    #[test]
    fn stuck_advancement_is_reported() {
        let report = audit(&stuck_store());
        let stuck: Vec<_> = report
            .findings
            .iter()
            .filter(|f| matches!(f, Finding::StuckAdvancement { .. }))
            .collect();
        assert_eq!(stuck.len(), 2);
    }

    #[test]
    fn wrong_occupant_is_reported() {
        let store = stuck_store();
        store
            .try_set_player(&wb(2, 1).slot_ref(SlotPosition::Player1), &e("p02"))
            .unwrap();
        let report = audit(&store);
        assert!(report.findings.iter().any(|f| matches!(
            f,
            Finding::WrongOccupant { expected, found, .. }
                if *expected == e("p01") && *found == e("p02")
        )));
        // p02 now sits in A-WB-R2-M1 while also being booked nowhere else
        // open, so no duplicate finding for them.
        assert!(!report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::DuplicateEntrant { .. })));
    }

    #[test]
    fn duplicate_entrant_is_reported() {
        let store = MemoryMatchStore::new();
        store
            .try_set_player(&wb(1, 1).slot_ref(SlotPosition::Player1), &e("p01"))
            .unwrap();
        store
            .try_set_player(&wb(1, 2).slot_ref(SlotPosition::Player1), &e("p01"))
            .unwrap();
        let report = audit(&store);
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::DuplicateEntrant { matches, .. } if matches.len() == 2)));
    }

    #[test]
    fn missing_and_unexpected_rows_are_reported() {
        let mut rows = MemoryMatchStore::new().snapshot();
        rows.retain(|m| m.id() != wb(3, 2));
        rows.push(Match::new(wb(4, 1)));
        let store = MemoryMatchStore::from_snapshot(rows).unwrap();
        let report = audit(&store);
        assert!(report
            .findings
            .contains(&Finding::MissingMatch { match_id: wb(3, 2) }));
        assert!(report
            .findings
            .contains(&Finding::UnexpectedMatch { match_id: wb(4, 1) }));
    }

    #[test]
    fn status_drift_is_reported() {
        let mut rows = MemoryMatchStore::new().snapshot();
        let mut json = serde_json::to_value(&rows[0]).unwrap();
        json["status"] = serde_json::json!("READY");
        rows[0] = serde_json::from_value(json).unwrap();
        let store = MemoryMatchStore::from_snapshot(rows).unwrap();
        assert!(audit(&store)
            .findings
            .iter()
            .any(|f| matches!(f, Finding::StatusMismatch { .. })));
    }

    #[test]
    fn repair_fills_stuck_slots_and_logs_them() {
        let engine = AdvancementEngine::new(stuck_store());
        let report = repair(&engine).unwrap();
        assert_eq!(report.repaired.len(), 2);
        assert!(report.remaining.is_empty(), "{:?}", report.remaining);
        assert_eq!(
            engine.store().get(&wb(2, 1)).unwrap().player1(),
            Some(&e("p01"))
        );
        let repairs = engine
            .events()
            .events()
            .into_iter()
            .filter(|ev| matches!(ev.kind, EventKind::SlotRepaired { .. }))
            .count();
        assert_eq!(repairs, 2);
    }

    #[test]
    fn repair_never_overwrites() {
        let store = stuck_store();
        store
            .try_set_player(&wb(2, 1).slot_ref(SlotPosition::Player1), &e("p02"))
            .unwrap();
        let engine = AdvancementEngine::new(store);
        let report = repair(&engine).unwrap();
        assert_eq!(
            engine.store().get(&wb(2, 1)).unwrap().player1(),
            Some(&e("p02"))
        );
        assert!(report
            .remaining
            .iter()
            .any(|f| matches!(f, Finding::WrongOccupant { .. })));
    }

    #[test]
    fn repair_on_clean_bracket_does_nothing() {
        let engine = AdvancementEngine::new(MemoryMatchStore::new());
        let digest = engine.store().digest().unwrap();
        let report = repair(&engine).unwrap();
        assert_eq!(report, RepairReport::default());
        assert_eq!(engine.store().digest().unwrap(), digest);
        assert!(engine.events().is_empty());
    }
}
