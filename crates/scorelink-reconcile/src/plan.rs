//! Pure reconciliation planning
//!
//! Records are matched by position only. Deciding what to do with an
//! incoming collection takes two questions:
//!
//! 1. Does it differ from the local one at all? (the no-op guard)
//! 2. How many records must be appended or deleted so the counts line up,
//!    and which aligned positions are overwritten?
//!
//! Nothing here touches the store.

use std::ops::Range;

use scorelink_core::domain::{Interval, Team};
use scorelink_core::wire::{IntervalData, TeamData};

/// Count alignment between a local and an incoming collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPlan {
    pub local_len: usize,
    pub incoming_len: usize,
}

impl CollectionPlan {
    pub fn new(local_len: usize, incoming_len: usize) -> Self {
        Self {
            local_len,
            incoming_len,
        }
    }

    /// Incoming indices to append as new local records
    pub fn append_range(&self) -> Range<usize> {
        self.local_len.min(self.incoming_len)..self.incoming_len
    }

    /// Local indices to delete, always a trailing run
    pub fn delete_range(&self) -> Range<usize> {
        self.incoming_len.min(self.local_len)..self.local_len
    }

    /// Positions that exist on both sides once counts are aligned
    pub fn overwrite_range(&self) -> Range<usize> {
        0..self.incoming_len
    }

    pub fn appends(&self) -> usize {
        self.append_range().len()
    }

    pub fn deletes(&self) -> usize {
        self.delete_range().len()
    }
}

// ============================================================================
// No-op guards
// ============================================================================

/// Whether a local team differs from the incoming one at the same position
///
/// Only the name, the color and the number of score events are compared.
pub fn team_differs(local: &Team, incoming: &TeamData) -> bool {
    local.name() != incoming.name
        || local.color() != &incoming.color
        || local.score().len() != incoming.score.len()
}

/// Whether an incoming team list must be applied
pub fn teams_need_update(local: &[Team], incoming: &[TeamData]) -> bool {
    local.len() != incoming.len()
        || local
            .iter()
            .zip(incoming)
            .any(|(local, incoming)| team_differs(local, incoming))
}

/// Whether an incoming interval list must be applied
///
/// Intervals are compared by name only.
pub fn intervals_need_update(local: &[Interval], incoming: &[IntervalData]) -> bool {
    local.len() != incoming.len()
        || local
            .iter()
            .zip(incoming)
            .any(|(local, incoming)| local.name() != incoming.name)
}

// ============================================================================
// Plans
// ============================================================================

/// Plans the team update, or `None` when the guard says nothing changed
pub fn plan_teams(local: &[Team], incoming: &[TeamData]) -> Option<CollectionPlan> {
    teams_need_update(local, incoming).then(|| CollectionPlan::new(local.len(), incoming.len()))
}

/// Plans the interval update, or `None` when the guard says nothing changed
pub fn plan_intervals(local: &[Interval], incoming: &[IntervalData]) -> Option<CollectionPlan> {
    intervals_need_update(local, incoming)
        .then(|| CollectionPlan::new(local.len(), incoming.len()))
}

/// Whether overwriting `local` with `incoming` would change anything stored
pub fn team_content_differs(local: &Team, incoming: &TeamData) -> bool {
    local.name() != incoming.name
        || local.color() != &incoming.color
        || local.score() != incoming.score.as_slice()
}

/// Whether overwriting `local` with `incoming` would change anything stored
pub fn interval_content_differs(local: &Interval, incoming: &IntervalData) -> bool {
    local.name() != incoming.name
        || local.created_at() != incoming.date
        || local.snapshots() != incoming.team_snapshots.as_slice()
}
