//! Plain-text rendering of a scoreboard

use scorelink_core::domain::{Interval, PreferenceSet, Team};

/// Renders teams and intervals as aligned lines
///
/// Scores are shown the way a device would display them: floored at zero
/// unless negative points are enabled.
pub fn render(teams: &[Team], intervals: &[Interval], prefs: &PreferenceSet) -> Vec<String> {
    let allow_negative = prefs.allow_negative_points();
    let width = teams.iter().map(|t| t.name().len()).max().unwrap_or(0).max(4);

    let mut lines = Vec::with_capacity(teams.len() + intervals.len() + 2);
    lines.push(format!("{:<width$}  {:>6}  Color", "Team", "Score"));
    for team in teams {
        lines.push(format!(
            "{:<width$}  {:>6}  #{}",
            team.name(),
            team.display_score(allow_negative),
            team.color()
        ));
    }

    if !intervals.is_empty() && prefs.intervals_enabled() {
        lines.push(String::new());
        let mut previous: Option<&Interval> = None;
        for interval in intervals {
            let gained = interval.score_gained(previous);
            let summary: Vec<String> = gained
                .iter()
                .map(|(name, points)| format!("{name} {points:+}"))
                .collect();
            lines.push(format!("{}: {}", interval.name(), summary.join(", ")));
            previous = Some(interval);
        }
    } else if !intervals.is_empty() {
        lines.push(format!("({} intervals, display disabled)", intervals.len()));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorelink_core::domain::preferences::{ALLOW_NEGATIVE_POINTS, INTERVALS_ENABLED};
    use scorelink_core::domain::{ColorHex, ScoreEvent};

    fn team(name: &str, deltas: &[i32]) -> Team {
        let score = deltas
            .iter()
            .map(|d| if *d > 0 { ScoreEvent::point() } else { ScoreEvent::penalty() })
            .collect();
        Team::with_score(name, ColorHex::new("AA00FF").unwrap(), score)
    }

    #[test]
    fn test_render_floors_scores_without_negative_points() {
        let teams = vec![team("Home", &[-1, -1]), team("Away", &[1])];
        let lines = render(&teams, &[], &PreferenceSet::new());
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Home"));
        assert!(lines[1].contains("     0"));
        assert!(lines[1].ends_with("#AA00FF"));
    }

    #[test]
    fn test_render_shows_negative_scores_when_allowed() {
        let teams = vec![team("Home", &[-1, -1]), team("Away", &[1])];
        let prefs = PreferenceSet::new().with(ALLOW_NEGATIVE_POINTS, true);
        let lines = render(&teams, &[], &prefs);
        assert!(lines[1].contains("    -2"));
    }

    #[test]
    fn test_render_lists_intervals_when_enabled() {
        let teams = vec![team("Home", &[1, 1]), team("Away", &[1])];
        let q1 = Interval::capture("Q1", &teams);
        let prefs = PreferenceSet::new().with(INTERVALS_ENABLED, true);

        let lines = render(&teams, &[q1.clone()], &prefs);
        assert_eq!(lines.last().unwrap(), "Q1: Away +1, Home +2");

        let hidden = render(&teams, &[q1], &PreferenceSet::new());
        assert_eq!(hidden.last().unwrap(), "(1 intervals, display disabled)");
    }
}
