//! Team entity and score events
//!
//! A [`Team`] owns an ordered list of [`ScoreEvent`]s. The running score is
//! always derived from the events, never stored separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ColorHex, TeamId};

/// Minimum number of teams a scoreboard keeps at all times
pub const MIN_TEAMS: usize = 2;

/// Names of the teams created on first launch and after a reinitialize
pub const DEFAULT_TEAM_NAMES: [&str; 2] = ["Team A", "Team B"];

/// Truncates a timestamp to millisecond resolution
///
/// Timestamps travel as floating-point epoch seconds; keeping them at
/// millisecond resolution makes the encoding lossless.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

// ============================================================================
// ScoreEvent
// ============================================================================

/// A single tap on a team's button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    timestamp: DateTime<Utc>,
    delta: i32,
}

impl ScoreEvent {
    /// Creates a score event; the timestamp is truncated to milliseconds
    pub fn new(timestamp: DateTime<Utc>, delta: i32) -> Self {
        Self {
            timestamp: truncate_to_millis(timestamp),
            delta,
        }
    }

    /// A +1 event at the current time
    pub fn point() -> Self {
        Self::new(Utc::now(), 1)
    }

    /// A -1 event at the current time
    pub fn penalty() -> Self {
        Self::new(Utc::now(), -1)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn delta(&self) -> i32 {
        self.delta
    }
}

/// Sum of all deltas
pub fn total_score(events: &[ScoreEvent]) -> i64 {
    events.iter().map(|e| i64::from(e.delta)).sum()
}

// ============================================================================
// Team
// ============================================================================

/// A team on the scoreboard
///
/// `id` and `created_at` are local to the device that holds the record.
/// Teams are listed in creation order, and that order is what the peer
/// protocol matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    created_at: DateTime<Utc>,
    name: String,
    color: ColorHex,
    score: Vec<ScoreEvent>,
}

impl Team {
    /// Creates a new team with no score
    pub fn new(name: impl Into<String>, color: ColorHex) -> Self {
        Self::with_score(name, color, Vec::new())
    }

    /// Creates a new team seeded with existing score events
    pub fn with_score(name: impl Into<String>, color: ColorHex, score: Vec<ScoreEvent>) -> Self {
        Self {
            id: TeamId::new(),
            created_at: truncate_to_millis(Utc::now()),
            name: name.into(),
            color,
            score,
        }
    }

    /// Rebuilds a team from persisted fields
    pub fn restore(
        id: TeamId,
        created_at: DateTime<Utc>,
        name: String,
        color: ColorHex,
        score: Vec<ScoreEvent>,
    ) -> Self {
        Self {
            id,
            created_at,
            name,
            color,
            score,
        }
    }

    /// The two teams a fresh scoreboard starts with
    pub fn defaults() -> Vec<Team> {
        DEFAULT_TEAM_NAMES
            .iter()
            .map(|name| Team::new(*name, ColorHex::random()))
            .collect()
    }

    // --- Accessors ---

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &ColorHex {
        &self.color
    }

    pub fn score(&self) -> &[ScoreEvent] {
        &self.score
    }

    // --- Mutators ---

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_color(&mut self, color: ColorHex) {
        self.color = color;
    }

    pub fn set_score(&mut self, score: Vec<ScoreEvent>) {
        self.score = score;
    }

    /// Clears every score event
    pub fn reset_score(&mut self) {
        self.score.clear();
    }

    /// Records a +1 tap
    pub fn increment(&mut self) {
        self.score.push(ScoreEvent::point());
    }

    /// Records a -1 tap
    ///
    /// With negative points allowed a -1 event is appended. Otherwise the
    /// most recent event is undone; an empty score stays empty. Returns
    /// whether the score changed.
    pub fn decrement(&mut self, allow_negative: bool) -> bool {
        if allow_negative {
            self.score.push(ScoreEvent::penalty());
            true
        } else {
            self.score.pop().is_some()
        }
    }

    /// Applies a single tap of `delta` (must be +1 or -1)
    pub fn record(&mut self, delta: i64, allow_negative: bool) -> Result<bool, DomainError> {
        match delta {
            1 => {
                self.increment();
                Ok(true)
            }
            -1 => Ok(self.decrement(allow_negative)),
            other => Err(DomainError::InvalidDelta(other)),
        }
    }

    /// Removes all negative events. Returns whether anything was removed.
    pub fn strip_negative_scores(&mut self) -> bool {
        let before = self.score.len();
        self.score.retain(|e| e.delta >= 0);
        self.score.len() != before
    }

    // --- Derived values ---

    pub fn total_score(&self) -> i64 {
        total_score(&self.score)
    }

    /// Total score, never below zero
    pub fn floored_score(&self) -> i64 {
        self.total_score().max(0)
    }

    /// The score shown to the user
    pub fn display_score(&self, allow_negative: bool) -> i64 {
        if allow_negative {
            self.total_score()
        } else {
            self.floored_score()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        Team::new("Home", ColorHex::new("FF0000").unwrap())
    }

    #[test]
    fn test_score_event_truncates_to_millis() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let event = ScoreEvent::new(ts, 1);
        assert_eq!(event.timestamp().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_increment_and_total() {
        let mut t = team();
        t.increment();
        t.increment();
        assert_eq!(t.total_score(), 2);
        assert_eq!(t.score().len(), 2);
    }

    #[test]
    fn test_decrement_without_negative_undoes_last() {
        let mut t = team();
        t.increment();
        assert!(t.decrement(false));
        assert!(t.score().is_empty());
        assert!(!t.decrement(false));
        assert_eq!(t.total_score(), 0);
    }

    #[test]
    fn test_decrement_with_negative_appends() {
        let mut t = team();
        assert!(t.decrement(true));
        assert_eq!(t.total_score(), -1);
        assert_eq!(t.floored_score(), 0);
        assert_eq!(t.display_score(true), -1);
        assert_eq!(t.display_score(false), 0);
    }

    #[test]
    fn test_record_rejects_large_delta() {
        let mut t = team();
        assert_eq!(t.record(5, true), Err(DomainError::InvalidDelta(5)));
    }

    #[test]
    fn test_strip_negative_scores() {
        let mut t = team();
        t.increment();
        t.decrement(true);
        t.increment();
        assert!(t.strip_negative_scores());
        assert_eq!(t.total_score(), 2);
        assert!(!t.strip_negative_scores());
    }

    #[test]
    fn test_defaults() {
        let teams = Team::defaults();
        assert_eq!(teams.len(), MIN_TEAMS);
        assert_eq!(teams[0].name(), "Team A");
        assert_eq!(teams[1].name(), "Team B");
        assert!(teams.iter().all(|t| t.score().is_empty()));
    }
}
