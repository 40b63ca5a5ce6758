//! # Identity Newtypes
//!
//! `EntrantId` is the only thing the engine knows about a player. It is
//! opaque: no rank, no profile, no display name. Those belong to the
//! player registry that sits outside this workspace.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SaboError;

/// Maximum accepted length of an entrant identifier, in bytes.
pub const MAX_ENTRANT_ID_LEN: usize = 64;

/// Opaque identifier of a tournament entrant.
///
/// Validated at construction: non-empty after trimming, no interior
/// whitespace, at most [`MAX_ENTRANT_ID_LEN`] bytes. Surrounding whitespace
/// is stripped so `" p01 "` and `"p01"` are the same entrant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntrantId(String);

impl EntrantId {
    /// Create a validated entrant identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, SaboError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SaboError::InvalidIdentifier(
                "entrant id must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_ENTRANT_ID_LEN {
            return Err(SaboError::InvalidIdentifier(format!(
                "entrant id exceeds {MAX_ENTRANT_ID_LEN} bytes: {trimmed:?}"
            )));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(SaboError::InvalidIdentifier(format!(
                "entrant id must not contain whitespace: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntrantId {
    type Error = SaboError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntrantId> for String {
    fn from(id: EntrantId) -> Self {
        id.0
    }
}

impl FromStr for EntrantId {
    type Err = SaboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for EntrantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one tournament instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TournamentId(pub Uuid);

impl TournamentId {
    /// Generate a new random tournament identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TournamentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TournamentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tournament:{}", self.0)
    }
}
