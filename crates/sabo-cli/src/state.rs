//! # State File
//!
//! One JSON document per tournament. The engine never sees the file: a
//! command rebuilds a [`MemoryMatchStore`] and [`EventLog`] from it, runs,
//! and folds the result back with [`TournamentState::absorb`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use sabo_bracket::{AdvancementEngine, AdvancementEvent, EventLog, MemoryMatchStore, SeedingPlan};
use sabo_core::{Timestamp, TournamentId};
use sabo_state::Match;

/// Everything persisted for one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentState {
    /// Fresh identifier drawn at `init`.
    pub id: TournamentId,
    /// Display name from the config.
    pub name: String,
    /// When `init` ran.
    pub created_at: Timestamp,
    /// The seeding plan, kept so a shuffled draw can be replayed.
    pub plan: SeedingPlan,
    /// All 55 match records, in key order.
    pub matches: Vec<Match>,
    /// Hash-chained advancement log. Missing in older files.
    #[serde(default)]
    pub events: Vec<AdvancementEvent>,
}

impl TournamentState {
    /// Create all 55 matches and seed round 1 from `plan`.
    pub fn create(name: &str, plan: SeedingPlan) -> Result<Self> {
        let engine = AdvancementEngine::new(MemoryMatchStore::new());
        let outcome = engine.seed(&plan).context("seeding failed")?;
        tracing::info!(placed = outcome.placed.len(), "new tournament seeded");
        let mut state = Self {
            id: TournamentId::new(),
            name: name.to_string(),
            created_at: Timestamp::now(),
            plan,
            matches: Vec::new(),
            events: Vec::new(),
        };
        state.absorb(engine);
        Ok(state)
    }

    /// Read a state file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "no tournament at {} (run `sabo init <config>` first)",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("corrupt state file {}", path.display()))
    }

    /// Write the state file, creating parent directories. The write goes
    /// through a sibling temp file so a crash never leaves half a document.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        tracing::debug!(path = %path.display(), matches = self.matches.len(), "state saved");
        Ok(())
    }

    /// The match rows as a store, without touching the event log.
    pub fn store(&self) -> Result<MemoryMatchStore> {
        MemoryMatchStore::from_snapshot(self.matches.clone()).context("state file match table")
    }

    /// Rebuild the engine. Fails if the event chain does not verify.
    pub fn engine(&self) -> Result<AdvancementEngine<MemoryMatchStore>> {
        let events =
            EventLog::from_events(self.events.clone()).context("state file event log")?;
        Ok(AdvancementEngine::with_events(self.store()?, events))
    }

    /// Take the engine's store and log back into the document.
    pub fn absorb(&mut self, engine: AdvancementEngine<MemoryMatchStore>) {
        let (store, events) = engine.into_parts();
        self.matches = store.snapshot();
        self.events = events.events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabo_bracket::MatchStore;
    use sabo_core::EntrantId;

    fn plan() -> SeedingPlan {
        SeedingPlan::ordered(
            (1..=32)
                .map(|i| EntrantId::new(format!("p{i:02}")).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn create_seeds_round_one() {
        let state = TournamentState::create("Club Open", plan()).unwrap();
        assert_eq!(state.matches.len(), 55);
        assert_eq!(state.matches.iter().filter(|m| m.is_playable()).count(), 16);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn save_then_load_preserves_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("t.json");
        let state = TournamentState::create("Club Open", plan()).unwrap();
        state.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(TournamentState::load(&path).unwrap(), state);
    }

    #[test]
    fn load_missing_file_mentions_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = TournamentState::load(&dir.path().join("t.json")).unwrap_err();
        assert!(err.to_string().contains("sabo init"));
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(&path, "{\"name\": 3}").unwrap();
        assert!(TournamentState::load(&path).is_err());
    }

    #[test]
    fn tampered_event_log_refuses_engine() {
        let mut state = TournamentState::create("Club Open", plan()).unwrap();
        let engine = state.engine().unwrap();
        let id = state.matches.iter().find(|m| m.is_playable()).unwrap().id();
        let winner = engine.store().get(&id).unwrap().player1().unwrap().clone();
        engine.record_result(&id, &winner).unwrap();
        state.absorb(engine);

        state.events.remove(1);
        assert!(state.engine().is_err());
        assert!(state.store().is_ok());
    }
}
