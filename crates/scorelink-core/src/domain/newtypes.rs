//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for record identifiers and color values.
//! Identifiers are local to one device's store and never leave it.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

/// Identifier for Team records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(Uuid);

impl TeamId {
    /// Create a new random TeamId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TeamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TeamId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid TeamId: {e}")))
    }
}

/// Identifier for Interval records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalId(Uuid);

impl IntervalId {
    /// Create a new random IntervalId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IntervalId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for IntervalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IntervalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid IntervalId: {e}")))
    }
}

// ============================================================================
// ColorHex
// ============================================================================

/// A team color as a 6-digit hex string without a leading `#`
///
/// The wire model only checks that a color is present; `ColorHex::new`
/// is for values entered locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorHex(String);

impl ColorHex {
    /// Create a validated ColorHex. A leading `#` is accepted and dropped.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.strip_prefix('#').unwrap_or(&value);
        if trimmed.len() != 6 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidColor(value));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Wrap a value received from the peer without validation
    #[must_use]
    pub fn from_wire(value: String) -> Self {
        Self(value)
    }

    /// A random color derived from fresh UUID bytes
    #[must_use]
    pub fn random() -> Self {
        let bytes = Uuid::new_v4();
        let b = bytes.as_bytes();
        Self(format!("{:02X}{:02X}{:02X}", b[0], b[1], b[2]))
    }

    /// Returns the color string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ColorHex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_roundtrip() {
        let id = TeamId::new();
        let parsed: TeamId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_interval_id_invalid() {
        let result = "not-a-uuid".parse::<IntervalId>();
        assert!(matches!(result, Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn test_color_hex_valid() {
        let color = ColorHex::new("#ff00aa").unwrap();
        assert_eq!(color.as_str(), "FF00AA");
    }

    #[test]
    fn test_color_hex_rejects_bad_length() {
        assert!(ColorHex::new("FFF").is_err());
        assert!(ColorHex::new("GG0000").is_err());
    }

    #[test]
    fn test_color_hex_random_is_valid() {
        let color = ColorHex::random();
        assert!(ColorHex::new(color.as_str()).is_ok());
    }
}
