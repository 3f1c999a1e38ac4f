//! Preference store port (driven/secondary port)
//!
//! A simple key-value store of boolean preferences. The UI reads it and
//! watches it for changes; the sync core only takes snapshots and
//! applies incoming sets.

use crate::domain::PreferenceSet;

/// Port trait for the device's preference storage
pub trait IPreferenceStore: Send + Sync {
    /// Returns the current value of every stored preference
    fn snapshot(&self) -> PreferenceSet;

    /// Overwrites every key present in `incoming`
    fn apply(&self, incoming: &PreferenceSet);
}
