//! Named intervals (quarters, halves, ...)
//!
//! An interval freezes every team's total at the moment it is created.
//! Intervals are never edited afterwards, only deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ColorHex, IntervalId};
use super::team::{truncate_to_millis, Team};

/// One team's total at the moment an interval was captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub team_name: String,
    pub team_color: ColorHex,
    pub total_score: i64,
}

/// A named interval with per-team snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    id: IntervalId,
    name: String,
    created_at: DateTime<Utc>,
    snapshots: Vec<TeamSnapshot>,
}

impl Interval {
    /// Creates an interval with explicit snapshots
    pub fn new(
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        snapshots: Vec<TeamSnapshot>,
    ) -> Self {
        Self {
            id: IntervalId::new(),
            name: name.into(),
            created_at: truncate_to_millis(created_at),
            snapshots,
        }
    }

    /// Captures the current totals of `teams`
    pub fn capture(name: impl Into<String>, teams: &[Team]) -> Self {
        let snapshots = teams
            .iter()
            .map(|team| TeamSnapshot {
                team_name: team.name().to_string(),
                team_color: team.color().clone(),
                total_score: team.total_score(),
            })
            .collect();
        Self::new(name, Utc::now(), snapshots)
    }

    /// Rebuilds an interval from persisted fields
    pub fn restore(
        id: IntervalId,
        name: String,
        created_at: DateTime<Utc>,
        snapshots: Vec<TeamSnapshot>,
    ) -> Self {
        Self {
            id,
            name,
            created_at,
            snapshots,
        }
    }

    pub fn id(&self) -> &IntervalId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn snapshots(&self) -> &[TeamSnapshot] {
        &self.snapshots
    }

    /// Overwrites every field but the identifier
    ///
    /// Used only when reconciling with the peer; local edits never
    /// modify an interval.
    pub fn overwrite(
        &mut self,
        name: String,
        created_at: DateTime<Utc>,
        snapshots: Vec<TeamSnapshot>,
    ) {
        self.name = name;
        self.created_at = created_at;
        self.snapshots = snapshots;
    }

    /// Points each team gained since `previous`
    ///
    /// Teams are matched by name. With no previous interval, or when a team
    /// is absent from it, the gain is the team's full total.
    pub fn score_gained(&self, previous: Option<&Interval>) -> BTreeMap<String, i64> {
        self.snapshots
            .iter()
            .map(|snapshot| {
                let before = previous
                    .and_then(|p| {
                        p.snapshots
                            .iter()
                            .find(|s| s.team_name == snapshot.team_name)
                    })
                    .map(|s| s.total_score)
                    .unwrap_or(0);
                (snapshot.team_name.clone(), snapshot.total_score - before)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, total: i64) -> TeamSnapshot {
        TeamSnapshot {
            team_name: name.to_string(),
            team_color: ColorHex::new("00FF00").unwrap(),
            total_score: total,
        }
    }

    #[test]
    fn test_capture_uses_totals() {
        let mut a = Team::new("A", ColorHex::new("FF0000").unwrap());
        a.increment();
        a.increment();
        let b = Team::new("B", ColorHex::new("0000FF").unwrap());

        let interval = Interval::capture("Q1", &[a, b]);
        assert_eq!(interval.name(), "Q1");
        assert_eq!(interval.snapshots().len(), 2);
        assert_eq!(interval.snapshots()[0].total_score, 2);
        assert_eq!(interval.snapshots()[1].total_score, 0);
    }

    #[test]
    fn test_score_gained_first_interval() {
        let q1 = Interval::new("Q1", Utc::now(), vec![snapshot("A", 10), snapshot("B", 8)]);
        let gains = q1.score_gained(None);
        assert_eq!(gains["A"], 10);
        assert_eq!(gains["B"], 8);
    }

    #[test]
    fn test_score_gained_against_previous() {
        let q1 = Interval::new("Q1", Utc::now(), vec![snapshot("A", 10), snapshot("B", 8)]);
        let q2 = Interval::new(
            "Q2",
            Utc::now(),
            vec![snapshot("A", 14), snapshot("B", 8), snapshot("C", 3)],
        );
        let gains = q2.score_gained(Some(&q1));
        assert_eq!(gains["A"], 4);
        assert_eq!(gains["B"], 0);
        assert_eq!(gains["C"], 3);
    }
}
