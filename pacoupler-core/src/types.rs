//! Shared value types
//!
//! - `Sref`: the PA API's self-referencing resource identifier
//! - `Watermark`: the cutoff timestamp used for incremental syncs

use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Sref
// =============================================================================

/// Resource reference as returned by the PA API (e.g. `testRuns/1234`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sref(String);

impl Sref {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier part of the reference (after the last `/`)
    pub fn id(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, id)) => id,
            None => &self.0,
        }
    }
}

impl fmt::Display for Sref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sref {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// Watermark
// =============================================================================

/// Format accepted for statically configured watermarks (`2017-01-30T00:00+0000`)
pub const SINCE_FORMAT: &str = "%Y-%m-%dT%H:%M%z";

/// Timestamp parsing errors
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("invalid timestamp '{value}': {source}")]
    Invalid {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Cutoff for incremental syncs: everything that ran after this point is fetched
///
/// Always rendered in the canonical UTC form with a `Z` suffix, which is how
/// the index stores `ranAt` values and what the PA API expects for `fromDate`:
/// `2020-01-01T00:00:00+00:00` renders as `2020-01-01T00:00:00Z` and non-zero
/// offsets are converted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Parses an ISO-8601 timestamp with a numeric UTC offset or a `Z` suffix
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let trimmed = raw.trim();
        DateTime::parse_from_rfc3339(trimmed)
            .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map(|at| Self(at.with_timezone(&Utc)))
            .map_err(|source| TimestampError::Invalid {
                value: raw.to_string(),
                source,
            })
    }

    /// Parses a configured `since` value (minute precision, numeric offset)
    pub fn parse_since(raw: &str) -> Result<Self, TimestampError> {
        DateTime::<FixedOffset>::parse_from_str(raw.trim(), SINCE_FORMAT)
            .map(|at| Self(at.with_timezone(&Utc)))
            .map_err(|source| TimestampError::Invalid {
                value: raw.to_string(),
                source,
            })
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}
