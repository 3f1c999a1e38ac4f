//! Full-state snapshot exchanged between peers
//!
//! A [`SyncPayload`] is built immediately before each send from the local
//! store and discarded afterwards. It never carries local record ids:
//! the peer matches records by position.

use chrono::{DateTime, Utc};

use crate::domain::{ColorHex, Interval, PreferenceSet, ScoreEvent, Team, TeamSnapshot};

/// Wire form of a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamData {
    pub name: String,
    pub color: ColorHex,
    pub score: Vec<ScoreEvent>,
}

impl TeamData {
    /// Creates a new local team record seeded from this wire record
    pub fn to_team(&self) -> Team {
        Team::with_score(self.name.clone(), self.color.clone(), self.score.clone())
    }

    /// Overwrites the synchronized fields of `team`
    pub fn apply_to(&self, team: &mut Team) {
        team.set_name(self.name.clone());
        team.set_color(self.color.clone());
        team.set_score(self.score.clone());
    }
}

impl From<&Team> for TeamData {
    fn from(team: &Team) -> Self {
        Self {
            name: team.name().to_string(),
            color: team.color().clone(),
            score: team.score().to_vec(),
        }
    }
}

/// Wire form of an interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalData {
    pub name: String,
    pub date: DateTime<Utc>,
    pub team_snapshots: Vec<TeamSnapshot>,
}

impl IntervalData {
    /// Creates a new local interval record seeded from this wire record
    pub fn to_interval(&self) -> Interval {
        Interval::new(self.name.clone(), self.date, self.team_snapshots.clone())
    }

    /// Overwrites the synchronized fields of `interval`
    pub fn apply_to(&self, interval: &mut Interval) {
        interval.overwrite(self.name.clone(), self.date, self.team_snapshots.clone());
    }
}

impl From<&Interval> for IntervalData {
    fn from(interval: &Interval) -> Self {
        Self {
            name: interval.name().to_string(),
            date: interval.created_at(),
            team_snapshots: interval.snapshots().to_vec(),
        }
    }
}

/// The unit of state replication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPayload {
    pub teams: Vec<TeamData>,
    pub intervals: Vec<IntervalData>,
    pub preferences: Option<PreferenceSet>,
}

impl SyncPayload {
    pub fn new(teams: Vec<TeamData>, intervals: Vec<IntervalData>) -> Self {
        Self {
            teams,
            intervals,
            preferences: None,
        }
    }

    /// Attaches a preference set
    pub fn with_preferences(mut self, preferences: PreferenceSet) -> Self {
        self.preferences = Some(preferences);
        self
    }
}

/// Builds a payload from the current store contents
///
/// `teams` and `intervals` must already be in creation order.
pub fn to_payload(
    teams: &[Team],
    intervals: &[Interval],
    preferences: Option<PreferenceSet>,
) -> SyncPayload {
    SyncPayload {
        teams: teams.iter().map(TeamData::from).collect(),
        intervals: intervals.iter().map(IntervalData::from).collect(),
        preferences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_payload_preserves_order_and_fields() {
        let mut a = Team::new("A", ColorHex::new("FF0000").unwrap());
        a.increment();
        let b = Team::new("B", ColorHex::new("0000FF").unwrap());
        let q1 = Interval::capture("Q1", &[a.clone(), b.clone()]);

        let payload = to_payload(&[a.clone(), b], &[q1], None);

        assert_eq!(payload.teams.len(), 2);
        assert_eq!(payload.teams[0].name, "A");
        assert_eq!(payload.teams[0].score, a.score().to_vec());
        assert_eq!(payload.teams[1].name, "B");
        assert_eq!(payload.intervals[0].name, "Q1");
        assert_eq!(payload.intervals[0].team_snapshots[0].total_score, 1);
        assert!(payload.preferences.is_none());
    }

    #[test]
    fn test_apply_to_keeps_identity() {
        let mut local = Team::new("Old", ColorHex::new("111111").unwrap());
        let id = *local.id();
        let incoming = TeamData {
            name: "New".to_string(),
            color: ColorHex::new("222222").unwrap(),
            score: vec![ScoreEvent::point()],
        };

        incoming.apply_to(&mut local);

        assert_eq!(*local.id(), id);
        assert_eq!(local.name(), "New");
        assert_eq!(local.color().as_str(), "222222");
        assert_eq!(local.total_score(), 1);
    }
}
