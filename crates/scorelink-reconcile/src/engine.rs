//! ReconciliationEngine - applies an incoming snapshot in one transaction
//!
//! For each collection (teams first, then intervals):
//!
//! 1. Fetch the local records in creation order and run the no-op guard.
//! 2. Append new local records for extra incoming positions.
//! 3. Delete trailing local records beyond the incoming count.
//! 4. Re-fetch and overwrite every aligned position from the incoming
//!    record at the same position.
//!
//! All writes of both collections are committed together. When neither
//! collection needs an update the transaction is dropped unused, so an
//! already-current snapshot causes zero store writes.

use tracing::{debug, info, warn};

use scorelink_core::domain::MIN_TEAMS;
use scorelink_core::ports::IStoreTransaction;
use scorelink_core::wire::{IntervalData, SyncPayload, TeamData};

use crate::error::ReconcileError;
use crate::plan::{interval_content_differs, plan_intervals, plan_teams, team_content_differs};

/// Writes made to one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionChange {
    pub appended: usize,
    pub deleted: usize,
    pub overwritten: usize,
}

impl CollectionChange {
    pub fn is_empty(&self) -> bool {
        self.writes() == 0
    }

    pub fn writes(&self) -> usize {
        self.appended + self.deleted + self.overwritten
    }
}

/// What an [`ReconciliationEngine::apply`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub teams: CollectionChange,
    pub intervals: CollectionChange,
    /// The incoming team list was too short to apply
    pub teams_refused: bool,
}

impl ReconcileOutcome {
    /// Nothing was written
    pub fn is_noop(&self) -> bool {
        self.teams.is_empty() && self.intervals.is_empty()
    }

    pub fn teams_changed(&self) -> bool {
        !self.teams.is_empty()
    }

    pub fn intervals_changed(&self) -> bool {
        !self.intervals.is_empty()
    }
}

/// Stateless positional reconciler
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reconciles `payload` into the store through `tx`
    ///
    /// Commits once if anything changed. On error the transaction is
    /// dropped and the store keeps its previous committed state.
    pub async fn apply(
        &self,
        mut tx: Box<dyn IStoreTransaction>,
        payload: &SyncPayload,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut outcome = ReconcileOutcome::default();

        if payload.teams.len() < MIN_TEAMS {
            warn!(
                incoming = payload.teams.len(),
                min = MIN_TEAMS,
                "Incoming snapshot has too few teams, leaving teams untouched"
            );
            outcome.teams_refused = true;
        } else {
            outcome.teams = reconcile_teams(tx.as_mut(), &payload.teams).await?;
        }

        outcome.intervals = reconcile_intervals(tx.as_mut(), &payload.intervals).await?;

        if outcome.is_noop() {
            debug!("Incoming snapshot matches local state, nothing to apply");
            return Ok(outcome);
        }

        tx.commit().await.map_err(ReconcileError::Commit)?;

        info!(
            teams_appended = outcome.teams.appended,
            teams_deleted = outcome.teams.deleted,
            teams_overwritten = outcome.teams.overwritten,
            intervals_appended = outcome.intervals.appended,
            intervals_deleted = outcome.intervals.deleted,
            intervals_overwritten = outcome.intervals.overwritten,
            "Applied incoming snapshot"
        );
        Ok(outcome)
    }
}

async fn reconcile_teams(
    tx: &mut dyn IStoreTransaction,
    incoming: &[TeamData],
) -> Result<CollectionChange, ReconcileError> {
    let local = tx
        .fetch_teams()
        .await
        .map_err(ReconcileError::fetch("teams"))?;

    let Some(plan) = plan_teams(&local, incoming) else {
        return Ok(CollectionChange::default());
    };
    let mut change = CollectionChange::default();

    for data in &incoming[plan.append_range()] {
        tx.insert_team(&data.to_team())
            .await
            .map_err(ReconcileError::write("teams"))?;
        change.appended += 1;
    }

    for team in &local[plan.delete_range()] {
        tx.delete_team(team.id())
            .await
            .map_err(ReconcileError::write("teams"))?;
        change.deleted += 1;
    }

    let aligned = tx
        .fetch_teams()
        .await
        .map_err(ReconcileError::fetch("teams"))?;

    for (mut team, data) in aligned.into_iter().zip(incoming) {
        if !team_content_differs(&team, data) {
            continue;
        }
        data.apply_to(&mut team);
        tx.update_team(&team)
            .await
            .map_err(ReconcileError::write("teams"))?;
        change.overwritten += 1;
    }

    Ok(change)
}

async fn reconcile_intervals(
    tx: &mut dyn IStoreTransaction,
    incoming: &[IntervalData],
) -> Result<CollectionChange, ReconcileError> {
    let local = tx
        .fetch_intervals()
        .await
        .map_err(ReconcileError::fetch("intervals"))?;

    let Some(plan) = plan_intervals(&local, incoming) else {
        return Ok(CollectionChange::default());
    };
    let mut change = CollectionChange::default();

    for data in &incoming[plan.append_range()] {
        tx.insert_interval(&data.to_interval())
            .await
            .map_err(ReconcileError::write("intervals"))?;
        change.appended += 1;
    }

    for interval in &local[plan.delete_range()] {
        tx.delete_interval(interval.id())
            .await
            .map_err(ReconcileError::write("intervals"))?;
        change.deleted += 1;
    }

    let aligned = tx
        .fetch_intervals()
        .await
        .map_err(ReconcileError::fetch("intervals"))?;

    for (mut interval, data) in aligned.into_iter().zip(incoming) {
        if !interval_content_differs(&interval, data) {
            continue;
        }
        data.apply_to(&mut interval);
        tx.update_interval(&interval)
            .await
            .map_err(ReconcileError::write("intervals"))?;
        change.overwritten += 1;
    }

    Ok(change)
}
