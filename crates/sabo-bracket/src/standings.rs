//! # Progress and Standings
//!
//! Read-only views over a set of match records: how far the tournament
//! has got, and who finished where. Both work on partial tournaments.

use serde::{Deserialize, Serialize};

use sabo_core::{BracketKind, EntrantId, Group, MatchId};
use sabo_state::{Match, MatchStatus};

use crate::topology::{self, CROSS_FINAL};

/// Where the tournament is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Round 1 not yet filled.
    Unseeded,
    /// Winners Bracket or a Losers Branch still has open matches.
    GroupStage,
    /// Only Group Final matches remain in the group stage.
    GroupFinals,
    /// All four Group Finals are decided.
    CrossBracket,
    /// The Cross Final is decided.
    Finished,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unseeded => "unseeded",
            Self::GroupStage => "group stage",
            Self::GroupFinals => "group finals",
            Self::CrossBracket => "cross bracket",
            Self::Finished => "finished",
        })
    }
}

/// Completion count for one bracket of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketProgress {
    /// Owning group, `None` for the cross stage.
    pub group: Option<Group>,
    /// The bracket.
    pub bracket: BracketKind,
    /// Matches completed.
    pub completed: usize,
    /// Matches ready to be played.
    pub ready: usize,
    /// Matches in the bracket.
    pub total: usize,
}

/// Tournament-wide progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase.
    pub phase: Phase,
    /// Matches completed.
    pub completed: usize,
    /// Matches in the tournament.
    pub total: usize,
    /// Per-bracket breakdown in canonical order.
    pub brackets: Vec<BracketProgress>,
}

impl Progress {
    /// Compute progress from match records.
    pub fn from_matches(matches: &[Match]) -> Self {
        let status_of = |id: &MatchId| {
            matches
                .iter()
                .find(|m| m.id() == *id)
                .map(|m| m.status())
                .unwrap_or(MatchStatus::Empty)
        };

        let mut brackets = Vec::new();
        let groups = Group::ALL.into_iter().map(Some).chain([None]);
        for group in groups {
            for bracket in BracketKind::ALL {
                if bracket.is_group_stage() != group.is_some() {
                    continue;
                }
                let ids = topology::matches_in(group, bracket);
                let statuses: Vec<_> = ids.iter().map(&status_of).collect();
                brackets.push(BracketProgress {
                    group,
                    bracket,
                    completed: statuses
                        .iter()
                        .filter(|s| **s == MatchStatus::Completed)
                        .count(),
                    ready: statuses.iter().filter(|s| **s == MatchStatus::Ready).count(),
                    total: ids.len(),
                });
            }
        }

        let done = |pred: &dyn Fn(&BracketProgress) -> bool| {
            brackets
                .iter()
                .filter(|b| pred(b))
                .all(|b| b.completed == b.total)
        };
        let seeded = topology::round_of(Some(Group::A), BracketKind::WinnersBracket, 1)
            .iter()
            .chain(&topology::round_of(
                Some(Group::B),
                BracketKind::WinnersBracket,
                1,
            ))
            .any(|id| status_of(id) != MatchStatus::Empty);

        let phase = if status_of(&CROSS_FINAL) == MatchStatus::Completed {
            Phase::Finished
        } else if done(&|b| b.bracket == BracketKind::GroupFinal) {
            Phase::CrossBracket
        } else if done(&|b| b.group.is_some() && b.bracket != BracketKind::GroupFinal) {
            Phase::GroupFinals
        } else if seeded {
            Phase::GroupStage
        } else {
            Phase::Unseeded
        };

        Self {
            phase,
            completed: brackets.iter().map(|b| b.completed).sum(),
            total: topology::TOTAL_MATCHES,
            brackets,
        }
    }
}

/// Final placings, filled in as the deciding matches complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    /// Cross Final winner.
    pub champion: Option<EntrantId>,
    /// Cross Final loser.
    pub runner_up: Option<EntrantId>,
    /// Losers of the two Cross Semifinals, in semifinal order.
    pub semifinalists: Vec<EntrantId>,
    /// Losers of the four Group Finals, Group A first.
    pub group_finalists: Vec<(Group, EntrantId)>,
}

impl Standings {
    /// Compute standings from match records.
    pub fn from_matches(matches: &[Match]) -> Self {
        let get = |id: &MatchId| matches.iter().find(|m| m.id() == *id);
        let mut out = Self::default();

        if let Some(cf) = get(&CROSS_FINAL).filter(|m| m.is_completed()) {
            out.champion = cf.winner().cloned();
            out.runner_up = cf.loser().cloned();
        }
        for id in topology::matches_in(None, BracketKind::CrossSemifinal) {
            if let Some(loser) = get(&id).and_then(|m| m.loser()) {
                out.semifinalists.push(loser.clone());
            }
        }
        for group in Group::ALL {
            for id in topology::matches_in(Some(group), BracketKind::GroupFinal) {
                if let Some(loser) = get(&id).and_then(|m| m.loser()) {
                    out.group_finalists.push((group, loser.clone()));
                }
            }
        }
        out
    }
}

/// Every match an entrant has appeared in, in canonical order.
pub fn entrant_history<'a>(matches: &'a [Match], entrant: &EntrantId) -> Vec<&'a Match> {
    let mut out: Vec<&Match> = matches
        .iter()
        .filter(|m| m.position_of(entrant).is_some())
        .collect();
    out.sort_by_key(|m| canonical_index(&m.id()));
    out
}

fn canonical_index(id: &MatchId) -> usize {
    topology::all_matches()
        .iter()
        .position(|m| m == id)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AdvancementEngine;
    use crate::seeding::SeedingPlan;
    use crate::store::{MatchStore, MemoryMatchStore};

    fn e(s: &str) -> EntrantId {
        EntrantId::new(s).unwrap()
    }

    fn seeded() -> AdvancementEngine<MemoryMatchStore> {
        let field = (1..=32).map(|i| e(&format!("p{i:02}"))).collect();
        let engine = AdvancementEngine::new(MemoryMatchStore::new());
        engine.seed(&SeedingPlan::ordered(field).unwrap()).unwrap();
        engine
    }

    #[test]
    fn fresh_store_is_unseeded() {
        let store = MemoryMatchStore::new();
        let p = Progress::from_matches(&store.all());
        assert_eq!(p.phase, Phase::Unseeded);
        assert_eq!(p.completed, 0);
        assert_eq!(p.total, 55);
        assert_eq!(p.brackets.len(), 2 * 4 + 2);
    }

    #[test]
    fn seeded_store_is_group_stage_with_sixteen_ready() {
        let engine = seeded();
        let p = Progress::from_matches(&engine.store().all());
        assert_eq!(p.phase, Phase::GroupStage);
        let wb_ready: usize = p
            .brackets
            .iter()
            .filter(|b| b.bracket == BracketKind::WinnersBracket)
            .map(|b| b.ready)
            .sum();
        assert_eq!(wb_ready, 16);
    }

    #[test]
    fn history_follows_entrant() {
        let engine = seeded();
        let wb = |r, s| MatchId::in_group(Group::A, BracketKind::WinnersBracket, r, s);
        engine.record_result(&wb(1, 1), &e("p01")).unwrap();
        engine.record_result(&wb(1, 2), &e("p03")).unwrap();
        let all = engine.store().all();
        let h: Vec<String> = entrant_history(&all, &e("p01"))
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        assert_eq!(h, vec!["A-WB-R1-M1", "A-WB-R2-M1"]);

        let h2: Vec<String> = entrant_history(&all, &e("p02"))
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        assert_eq!(h2, vec!["A-WB-R1-M1", "A-LA-R1-M1"]);
    }

    #[test]
    fn standings_start_empty() {
        let engine = seeded();
        let s = Standings::from_matches(&engine.store().all());
        assert_eq!(s, Standings::default());
    }
}
