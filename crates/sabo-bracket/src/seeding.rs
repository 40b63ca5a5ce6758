//! # Seeding
//!
//! Assigns the 32 entrants to the 16 Winners Bracket round 1 matches.
//! The first 16 entrants of the (possibly shuffled) list form Group A, the
//! rest Group B; within a group, entrants `2i` and `2i+1` meet in slot
//! `i+1`.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabo_core::{BracketKind, EntrantId, Group, MatchId, SlotPosition, SlotRef};

use crate::topology::{ENTRANT_COUNT, GROUP_SIZE};

/// Rejections raised when building a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedingError {
    /// The field must be exactly 32 entrants.
    #[error("a SABO-32 field needs exactly {expected} entrants, got {found}")]
    WrongCount {
        /// Always 32.
        expected: usize,
        /// What was supplied.
        found: usize,
    },

    /// An entrant was listed twice.
    #[error("entrant {0} is listed more than once")]
    Duplicate(EntrantId),
}

/// How the entrant list was turned into a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SeedingMode {
    /// List order.
    Ordered,
    /// Seeded shuffle.
    Shuffled {
        /// RNG seed.
        seed: u64,
    },
}

/// A validated draw: 32 distinct entrants in seed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct SeedingPlan {
    mode: SeedingMode,
    order: Vec<EntrantId>,
}

#[derive(Deserialize)]
struct RawPlan {
    mode: SeedingMode,
    order: Vec<EntrantId>,
}

impl TryFrom<RawPlan> for SeedingPlan {
    type Error = SeedingError;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        validate(&raw.order)?;
        Ok(Self {
            mode: raw.mode,
            order: raw.order,
        })
    }
}

impl SeedingPlan {
    /// Keep the list order.
    pub fn ordered(entrants: Vec<EntrantId>) -> Result<Self, SeedingError> {
        validate(&entrants)?;
        Ok(Self {
            mode: SeedingMode::Ordered,
            order: entrants,
        })
    }

    /// Shuffle with a seeded RNG. The same list and seed always produce
    /// the same draw.
    pub fn shuffled(mut entrants: Vec<EntrantId>, seed: u64) -> Result<Self, SeedingError> {
        validate(&entrants)?;
        let mut rng = StdRng::seed_from_u64(seed);
        entrants.shuffle(&mut rng);
        Ok(Self {
            mode: SeedingMode::Shuffled { seed },
            order: entrants,
        })
    }

    /// How this plan was built.
    pub fn mode(&self) -> SeedingMode {
        self.mode
    }

    /// Entrants in seed order.
    pub fn entrants(&self) -> &[EntrantId] {
        &self.order
    }

    /// Entrants of one group, in seed order.
    pub fn group(&self, group: Group) -> &[EntrantId] {
        match group {
            Group::A => &self.order[..GROUP_SIZE],
            Group::B => &self.order[GROUP_SIZE..],
        }
    }

    /// Which group an entrant was drawn into.
    pub fn group_of(&self, entrant: &EntrantId) -> Option<Group> {
        let idx = self.order.iter().position(|e| e == entrant)?;
        Some(if idx < GROUP_SIZE { Group::A } else { Group::B })
    }

    /// Every round 1 slot with its entrant, Group A first.
    pub fn assignments(&self) -> Vec<(SlotRef, EntrantId)> {
        let mut out = Vec::with_capacity(ENTRANT_COUNT);
        for group in Group::ALL {
            for (i, entrant) in self.group(group).iter().enumerate() {
                let slot = (i / 2) as u8 + 1;
                let position = if i % 2 == 0 {
                    SlotPosition::Player1
                } else {
                    SlotPosition::Player2
                };
                let id = MatchId::in_group(group, BracketKind::WinnersBracket, 1, slot);
                out.push((id.slot_ref(position), entrant.clone()));
            }
        }
        out
    }
}

fn validate(entrants: &[EntrantId]) -> Result<(), SeedingError> {
    if entrants.len() != ENTRANT_COUNT {
        return Err(SeedingError::WrongCount {
            expected: ENTRANT_COUNT,
            found: entrants.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for e in entrants {
        if !seen.insert(e) {
            return Err(SeedingError::Duplicate(e.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Vec<EntrantId> {
        (1..=32)
            .map(|i| EntrantId::new(format!("p{i:02}")).unwrap())
            .collect()
    }

    #[test]
    fn ordered_plan_pairs_neighbours() {
        let plan = SeedingPlan::ordered(field()).unwrap();
        let a = plan.assignments();
        assert_eq!(a.len(), 32);
        assert_eq!(a[0].0.to_string(), "A-WB-R1-M1.p1");
        assert_eq!(a[0].1.as_str(), "p01");
        assert_eq!(a[1].0.to_string(), "A-WB-R1-M1.p2");
        assert_eq!(a[1].1.as_str(), "p02");
        assert_eq!(a[15].0.to_string(), "A-WB-R1-M8.p2");
        assert_eq!(a[16].0.to_string(), "B-WB-R1-M1.p1");
        assert_eq!(a[16].1.as_str(), "p17");
    }

    #[test]
    fn groups_split_sixteen_sixteen() {
        let plan = SeedingPlan::ordered(field()).unwrap();
        assert_eq!(plan.group(Group::A).len(), 16);
        assert_eq!(plan.group(Group::B)[0].as_str(), "p17");
        assert_eq!(plan.group_of(&EntrantId::new("p16").unwrap()), Some(Group::A));
        assert_eq!(plan.group_of(&EntrantId::new("p17").unwrap()), Some(Group::B));
        assert_eq!(plan.group_of(&EntrantId::new("p99").unwrap()), None);
    }

    #[test]
    fn wrong_count_is_rejected() {
        let mut f = field();
        f.pop();
        assert_eq!(
            SeedingPlan::ordered(f).unwrap_err(),
            SeedingError::WrongCount {
                expected: 32,
                found: 31
            }
        );
    }

    #[test]
    fn duplicate_entrant_is_rejected() {
        let mut f = field();
        f[31] = f[0].clone();
        assert!(matches!(
            SeedingPlan::shuffled(f, 7).unwrap_err(),
            SeedingError::Duplicate(_)
        ));
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let a = SeedingPlan::shuffled(field(), 42).unwrap();
        let b = SeedingPlan::shuffled(field(), 42).unwrap();
        let c = SeedingPlan::shuffled(field(), 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.entrants(), c.entrants());
        assert_eq!(a.mode(), SeedingMode::Shuffled { seed: 42 });
    }

    #[test]
    fn deserializing_revalidates() {
        let plan = SeedingPlan::ordered(field()).unwrap();
        let mut json = serde_json::to_value(&plan).unwrap();
        json["order"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<SeedingPlan>(json).is_err());

        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(serde_json::from_str::<SeedingPlan>(&json).unwrap(), plan);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let plan = SeedingPlan::shuffled(field(), 9).unwrap();
        let mut sorted = plan.entrants().to_vec();
        sorted.sort();
        assert_eq!(sorted, field());
    }
}
