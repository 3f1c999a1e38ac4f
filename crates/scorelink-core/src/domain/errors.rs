//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and scoreboard invariants.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Color is not a 6-digit hex string
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Score deltas are single taps (+1 or -1)
    #[error("Invalid score delta: {0}")]
    InvalidDelta(i64),

    /// Removing a team would leave fewer than the minimum
    #[error("Scoreboard needs at least {min} teams, {remaining} would remain")]
    BelowMinimumTeams {
        /// Minimum number of teams
        min: usize,
        /// Count that would remain after the operation
        remaining: usize,
    },

    /// No team with the given identifier exists
    #[error("Team not found: {0}")]
    TeamNotFound(String),

    /// No interval with the given identifier exists
    #[error("Interval not found: {0}")]
    IntervalNotFound(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidColor("zzz".to_string());
        assert_eq!(err.to_string(), "Invalid color: zzz");

        let err = DomainError::BelowMinimumTeams {
            min: 2,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "Scoreboard needs at least 2 teams, 1 would remain"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidDelta(3);
        let err2 = DomainError::InvalidDelta(3);
        let err3 = DomainError::InvalidDelta(-4);

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
