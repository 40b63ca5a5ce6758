//! # Match Store
//!
//! The engine reads and writes match records only through [`MatchStore`].
//! Implementations must serialize mutations per match (row-level locking
//! or compare-and-swap); mutations on different matches may run in
//! parallel.
//!
//! [`MemoryMatchStore`] is the bundled implementation: the key set is
//! fixed at construction and each row sits behind its own
//! `parking_lot::Mutex`, so there is no tournament-wide lock.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use thiserror::Error;

use sabo_core::{
    sha256_digest, BracketKind, CanonicalBytes, CanonicalizationError, ContentDigest, EntrantId,
    Group, MatchId, SlotRef,
};
use sabo_state::{Match, MatchError, MatchStatus, Placement, Score};

use crate::topology;

/// Errors returned by a [`MatchStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record under this key.
    #[error("match {0} not found in store")]
    NotFound(MatchId),

    /// The record refused the mutation. The record is unchanged.
    #[error("match rejected the update: {0}")]
    Rejected(#[from] MatchError),

    /// A snapshot contained the same key twice.
    #[error("snapshot contains {0} more than once")]
    DuplicateKey(MatchId),
}

/// Outcome of [`MatchStore::try_set_player()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetPlayer {
    /// Written. The match is now in the given state.
    Placed(MatchStatus),
    /// The entrant already held the slot.
    Unchanged,
    /// A different entrant holds the slot. Nothing was written.
    Collision {
        /// Current holder.
        occupant: EntrantId,
    },
}

/// Storage contract consumed by the engine, resolvers, and audit.
pub trait MatchStore: Send + Sync {
    /// Fetch one record.
    fn get(&self, id: &MatchId) -> Result<Match, StoreError>;

    /// All records of one round, in slot order.
    fn list_by_group_bracket_round(
        &self,
        group: Option<Group>,
        bracket: BracketKind,
        round: u8,
    ) -> Vec<Match>;

    /// Write `entrant` into an empty slot. Never overwrites.
    fn try_set_player(&self, slot: &SlotRef, entrant: &EntrantId) -> Result<SetPlayer, StoreError>;

    /// Record the result of a `Ready` match and return the updated record.
    fn set_result(
        &self,
        id: &MatchId,
        winner: &EntrantId,
        score: Option<Score>,
    ) -> Result<Match, StoreError>;

    /// Every record, in key order.
    fn all(&self) -> Vec<Match>;
}

// ─── In-Memory Store ─────────────────────────────────────────────────

/// Thread-safe in-memory store with one lock per match.
#[derive(Debug)]
pub struct MemoryMatchStore {
    rows: BTreeMap<MatchId, Mutex<Match>>,
}

impl MemoryMatchStore {
    /// A store holding every match of a fresh SABO-32 bracket, all `Empty`.
    pub fn new() -> Self {
        let rows = topology::all_matches()
            .into_iter()
            .map(|id| (id, Mutex::new(Match::new(id))))
            .collect();
        Self { rows }
    }

    /// Rebuild a store from persisted records.
    ///
    /// Rows are loaded as they are, including rows the topology does not
    /// know and rows whose status drifted. Run [`crate::audit::audit()`]
    /// to surface those.
    pub fn from_snapshot(matches: Vec<Match>) -> Result<Self, StoreError> {
        let mut rows = BTreeMap::new();
        for m in matches {
            let id = m.id();
            if rows.insert(id, Mutex::new(m)).is_some() {
                return Err(StoreError::DuplicateKey(id));
            }
        }
        Ok(Self { rows })
    }

    /// Copy of every record, in key order.
    pub fn snapshot(&self) -> Vec<Match> {
        self.all()
    }

    /// Number of stored matches.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// SHA-256 over the canonical form of the snapshot.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(&self.snapshot())?))
    }

    fn row(&self, id: &MatchId) -> Result<&Mutex<Match>, StoreError> {
        self.rows.get(id).ok_or(StoreError::NotFound(*id))
    }
}

impl Default for MemoryMatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStore for MemoryMatchStore {
    fn get(&self, id: &MatchId) -> Result<Match, StoreError> {
        Ok(self.row(id)?.lock().clone())
    }

    fn list_by_group_bracket_round(
        &self,
        group: Option<Group>,
        bracket: BracketKind,
        round: u8,
    ) -> Vec<Match> {
        self.rows
            .iter()
            .filter(|(id, _)| id.group == group && id.bracket == bracket && id.round == round)
            .map(|(_, row)| row.lock().clone())
            .collect()
    }

    fn try_set_player(&self, slot: &SlotRef, entrant: &EntrantId) -> Result<SetPlayer, StoreError> {
        let mut row = self.row(&slot.match_id)?.lock();
        match row.place(slot.position, entrant.clone()) {
            Ok(Placement::Placed(status)) => Ok(SetPlayer::Placed(status)),
            Ok(Placement::AlreadyPresent) => Ok(SetPlayer::Unchanged),
            Err(MatchError::SlotOccupied { occupant, .. }) => Ok(SetPlayer::Collision { occupant }),
            Err(e) => Err(StoreError::Rejected(e)),
        }
    }

    fn set_result(
        &self,
        id: &MatchId,
        winner: &EntrantId,
        score: Option<Score>,
    ) -> Result<Match, StoreError> {
        let mut row = self.row(id)?.lock();
        row.complete(winner, score)?;
        Ok(row.clone())
    }

    fn all(&self) -> Vec<Match> {
        self.rows.values().map(|row| row.lock().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabo_core::SlotPosition;

    fn e(s: &str) -> EntrantId {
        EntrantId::new(s).unwrap()
    }

    fn wb1(slot: u8) -> MatchId {
        MatchId::in_group(Group::A, BracketKind::WinnersBracket, 1, slot)
    }

    #[test]
    fn new_store_has_every_match_empty() {
        let store = MemoryMatchStore::new();
        assert_eq!(store.len(), topology::TOTAL_MATCHES);
        assert!(store.all().iter().all(|m| m.status() == MatchStatus::Empty));
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = MemoryMatchStore::new();
        let bogus = MatchId::in_group(Group::A, BracketKind::WinnersBracket, 9, 1);
        assert_eq!(store.get(&bogus), Err(StoreError::NotFound(bogus)));
    }

    #[test]
    fn try_set_player_never_overwrites() {
        let store = MemoryMatchStore::new();
        let slot = wb1(1).slot_ref(SlotPosition::Player1);

        assert_eq!(
            store.try_set_player(&slot, &e("p01")).unwrap(),
            SetPlayer::Placed(MatchStatus::AwaitingPlayers)
        );
        assert_eq!(
            store.try_set_player(&slot, &e("p01")).unwrap(),
            SetPlayer::Unchanged
        );
        assert_eq!(
            store.try_set_player(&slot, &e("p02")).unwrap(),
            SetPlayer::Collision { occupant: e("p01") }
        );
        assert_eq!(store.get(&wb1(1)).unwrap().player1(), Some(&e("p01")));
    }

    #[test]
    fn set_result_requires_ready() {
        let store = MemoryMatchStore::new();
        let err = store.set_result(&wb1(1), &e("p01"), None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(MatchError::NotReady { .. })
        ));
    }

    #[test]
    fn set_result_completes_ready_match() {
        let store = MemoryMatchStore::new();
        store
            .try_set_player(&wb1(2).slot_ref(SlotPosition::Player1), &e("p03"))
            .unwrap();
        store
            .try_set_player(&wb1(2).slot_ref(SlotPosition::Player2), &e("p04"))
            .unwrap();
        let m = store.set_result(&wb1(2), &e("p04"), None).unwrap();
        assert_eq!(m.status(), MatchStatus::Completed);
        assert_eq!(m.loser(), Some(&e("p03")));
    }

    #[test]
    fn list_by_round_is_slot_ordered() {
        let store = MemoryMatchStore::new();
        let round = store.list_by_group_bracket_round(Some(Group::B), BracketKind::WinnersBracket, 2);
        let slots: Vec<u8> = round.iter().map(|m| m.id().slot).collect();
        assert_eq!(slots, vec![1, 2, 3, 4]);
        assert!(round.iter().all(|m| m.id().group == Some(Group::B)));
    }

    #[test]
    fn snapshot_roundtrip_preserves_digest() {
        let store = MemoryMatchStore::new();
        store
            .try_set_player(&wb1(3).slot_ref(SlotPosition::Player2), &e("p06"))
            .unwrap();
        let restored = MemoryMatchStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(restored.digest().unwrap(), store.digest().unwrap());
    }

    #[test]
    fn digest_changes_on_mutation() {
        let store = MemoryMatchStore::new();
        let before = store.digest().unwrap();
        store
            .try_set_player(&wb1(3).slot_ref(SlotPosition::Player2), &e("p06"))
            .unwrap();
        assert_ne!(store.digest().unwrap(), before);
    }

    #[test]
    fn snapshot_with_duplicate_key_is_rejected() {
        let rows = vec![Match::new(wb1(1)), Match::new(wb1(1))];
        assert_eq!(
            MemoryMatchStore::from_snapshot(rows).unwrap_err(),
            StoreError::DuplicateKey(wb1(1))
        );
    }
}
