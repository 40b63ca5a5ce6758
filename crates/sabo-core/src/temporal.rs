//! # UTC Timestamps
//!
//! `Timestamp` is UTC-only and truncated to whole seconds, so the same
//! instant always canonicalizes to the same bytes (`YYYY-MM-DDTHH:MM:SSZ`).
//! Non-UTC inputs are rejected at parse time rather than converted.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SaboError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, SaboError> {
        if !s.ends_with('Z') {
            return Err(SaboError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SaboError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 7, 19, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(987_654_321).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-03-07T19:30:45Z");
    }

    #[test]
    fn parse_accepts_z_suffix() {
        let ts = Timestamp::parse("2026-03-07T19:30:00Z").unwrap();
        assert_eq!(ts.to_string(), "2026-03-07T19:30:00Z");
    }

    #[test]
    fn parse_rejects_offsets() {
        assert!(Timestamp::parse("2026-03-07T19:30:00+00:00").is_err());
        assert!(Timestamp::parse("2026-03-07T19:30:00+07:00").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday Z").is_err());
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::parse("2026-03-07T19:30:00Z").unwrap();
        let b = Timestamp::parse("2026-03-07T19:31:00Z").unwrap();
        assert!(a < b);
    }
}
