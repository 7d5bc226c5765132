//! Speak token identifying a single `speak()` invocation

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Unique marker minted at the start of every speak call.
///
/// Only the most recently minted token is current; a speak whose token has
/// been superseded must not touch listening state when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeakToken(Uuid);

impl SpeakToken {
    /// Mint a new token (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a token from an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a token from a string
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidSpeakToken(e.to_string()))
    }

    /// Get the underlying UUID
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SpeakToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpeakToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tokens_are_unique() {
        let a = SpeakToken::new();
        let b = SpeakToken::new();
        assert_ne!(a, b);
    }

    #[test]
    fn token_roundtrips_through_string() {
        let original = SpeakToken::new();
        let parsed = SpeakToken::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = SpeakToken::parse("not-a-token").unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpeakToken(_)));
    }

    #[test]
    fn from_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(SpeakToken::from_uuid(uuid).as_uuid(), uuid);
    }
}
