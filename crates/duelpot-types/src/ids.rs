//! Identifiers used throughout Duelpot.
//!
//! Generated match IDs use UUIDv7 for time-ordered lexicographic sorting.
//! Callers may also supply their own (e.g. a game-lobby ID).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DuelpotError, Result, constants};

// ---------------------------------------------------------------------------
// MatchId
// ---------------------------------------------------------------------------

/// Unique match identifier. Never empty, never contains whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId(String);

impl MatchId {
    /// Generate a fresh, time-ordered match ID (`m_<uuidv7>`).
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            constants::MATCH_ID_PREFIX,
            Uuid::now_v7().simple()
        ))
    }

    /// Validate a caller-supplied ID.
    ///
    /// # Errors
    /// Returns [`DuelpotError::InvalidMatchId`] if the ID is empty or
    /// contains whitespace.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DuelpotError::InvalidMatchId {
                reason: "match ID must not be empty".into(),
            });
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(DuelpotError::InvalidMatchId {
                reason: format!("match ID {raw:?} contains whitespace"),
            });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MatchId {
    type Error = DuelpotError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(raw)
    }
}

impl TryFrom<&str> for MatchId {
    type Error = DuelpotError;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<MatchId> for String {
    fn from(id: MatchId) -> Self {
        id.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Opaque chain transaction identifier (Tron `txID`, Tezos operation hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
