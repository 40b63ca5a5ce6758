//! # Tournament Config
//!
//! The YAML file `sabo init` reads:
//!
//! ```yaml
//! name: Club Open 2026
//! entrants: [p01, p02, ..., p32]
//! seeding:
//!   mode: shuffled
//!   seed: 2026
//! ```
//!
//! `seeding` defaults to list order. A shuffle without a seed draws one,
//! and the drawn seed is kept in the plan so the draw can be replayed.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sabo_bracket::SeedingPlan;
use sabo_core::EntrantId;

/// Parsed tournament file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TournamentConfig {
    /// Display name.
    pub name: String,
    /// The 32 entrants, in seed order.
    pub entrants: Vec<EntrantId>,
    /// How to draw the bracket.
    #[serde(default)]
    pub seeding: SeedingConfig,
}

/// The `seeding` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedingConfig {
    /// Keep list order or shuffle. Defaults to `ordered`.
    #[serde(default)]
    pub mode: SeedingModeName,
    /// RNG seed for `shuffled`. Ignored for `ordered`.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `ordered` or `shuffled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedingModeName {
    /// Entrants are seeded in list order.
    #[default]
    Ordered,
    /// Entrants are shuffled with a seeded RNG before seeding.
    Shuffled,
}

impl TournamentConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if config.name.trim().is_empty() {
            anyhow::bail!("tournament name must not be empty");
        }
        Ok(config)
    }

    /// Build the validated seeding plan.
    pub fn plan(&self) -> Result<SeedingPlan> {
        let entrants = self.entrants.clone();
        let plan = match self.seeding.mode {
            SeedingModeName::Ordered => SeedingPlan::ordered(entrants)?,
            SeedingModeName::Shuffled => {
                let seed = self.seeding.seed.unwrap_or_else(rand::random);
                tracing::info!(seed, "shuffling entrants");
                SeedingPlan::shuffled(entrants, seed)?
            }
        };
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabo_bracket::SeedingMode;

    fn yaml(extra: &str) -> String {
        let entrants: Vec<String> = (1..=32).map(|i| format!("p{i:02}")).collect();
        format!("name: Club Open\nentrants: [{}]\n{extra}", entrants.join(", "))
    }

    #[test]
    fn seeding_defaults_to_ordered() {
        let config = TournamentConfig::from_yaml(&yaml("")).unwrap();
        assert_eq!(config.seeding.mode, SeedingModeName::Ordered);
        let plan = config.plan().unwrap();
        assert_eq!(plan.mode(), SeedingMode::Ordered);
        assert_eq!(plan.entrants()[0].as_str(), "p01");
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let config =
            TournamentConfig::from_yaml(&yaml("seeding:\n  mode: shuffled\n  seed: 7\n")).unwrap();
        let a = config.plan().unwrap();
        let b = config.plan().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mode(), SeedingMode::Shuffled { seed: 7 });
    }

    #[test]
    fn unseeded_shuffle_records_its_seed() {
        let config = TournamentConfig::from_yaml(&yaml("seeding:\n  mode: shuffled\n")).unwrap();
        let plan = config.plan().unwrap();
        assert!(matches!(plan.mode(), SeedingMode::Shuffled { .. }));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(TournamentConfig::from_yaml(&yaml("venue: Hall 3\n")).is_err());
        assert!(
            TournamentConfig::from_yaml(&yaml("seeding:\n  mode: ordered\n  rounds: 3\n"))
                .is_err()
        );
    }

    #[test]
    fn empty_name_rejected() {
        let text = yaml("").replace("name: Club Open", "name: \"  \"");
        assert!(TournamentConfig::from_yaml(&text).is_err());
    }

    #[test]
    fn short_field_fails_at_plan_time() {
        let config = TournamentConfig::from_yaml("name: Tiny\nentrants: [a, b, c]\n").unwrap();
        let err = config.plan().unwrap_err();
        assert!(err.to_string().contains("exactly 32"));
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = TournamentConfig::load(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("nope.yaml"));
    }
}
