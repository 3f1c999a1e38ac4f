//! Synchronized preferences
//!
//! A flat set of named booleans. There is no diffing: applying an incoming
//! set overwrites every key it carries and leaves the others alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a team's score may drop below zero
pub const ALLOW_NEGATIVE_POINTS: &str = "shouldAllowNegativePoints";

/// Whether the intervals feature is shown
pub const INTERVALS_ENABLED: &str = "hasEnabledIntervals";

/// Whether the screen stays on while scoring
pub const KEEP_SCREEN_AWAKE: &str = "shouldKeepScreenAwake";

/// A mapping of preference names to boolean values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceSet(BTreeMap<String, bool>);

impl PreferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: bool) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// Returns the value of `key`, `false` when unset
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).unwrap_or(false)
    }

    pub fn allow_negative_points(&self) -> bool {
        self.flag(ALLOW_NEGATIVE_POINTS)
    }

    pub fn intervals_enabled(&self) -> bool {
        self.flag(INTERVALS_ENABLED)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Overwrites every key present in `incoming`
    pub fn merge_from(&mut self, incoming: &PreferenceSet) {
        for (key, value) in &incoming.0 {
            self.0.insert(key.clone(), *value);
        }
    }
}

impl FromIterator<(String, bool)> for PreferenceSet {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flag_is_false() {
        let prefs = PreferenceSet::new();
        assert!(!prefs.allow_negative_points());
        assert_eq!(prefs.get(INTERVALS_ENABLED), None);
    }

    #[test]
    fn test_merge_overwrites_present_keys_only() {
        let mut local = PreferenceSet::new()
            .with(ALLOW_NEGATIVE_POINTS, true)
            .with(KEEP_SCREEN_AWAKE, true);
        let incoming = PreferenceSet::new()
            .with(ALLOW_NEGATIVE_POINTS, false)
            .with(INTERVALS_ENABLED, true);

        local.merge_from(&incoming);

        assert!(!local.allow_negative_points());
        assert!(local.intervals_enabled());
        assert!(local.flag(KEEP_SCREEN_AWAKE));
        assert_eq!(local.len(), 3);
    }
}
