//! Local edits and command handlers
//!
//! Every function here works inside a transaction the coordinator opened
//! and never commits it; the caller commits once and then replicates.

use tracing::debug;

use scorelink_core::domain::preferences::ALLOW_NEGATIVE_POINTS;
use scorelink_core::domain::{
    ColorHex, DomainError, Interval, IntervalId, PreferenceSet, Team, TeamId, MIN_TEAMS,
};
use scorelink_core::ports::{IRecordStore, IStoreTransaction};

use crate::SyncError;

/// An edit made by the user on this device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMutation {
    /// Appends a team; a random color is picked when none is given
    AddTeam {
        name: String,
        color: Option<ColorHex>,
    },
    /// Deletes a team, refused when it would leave fewer than two
    RemoveTeam { id: TeamId },
    RenameTeam { id: TeamId, name: String },
    RecolorTeam { id: TeamId, color: ColorHex },
    /// Adds a +1 event
    Increment { id: TeamId },
    /// Adds a -1 event or undoes the last event, depending on whether
    /// negative points are allowed
    Decrement { id: TeamId },
    /// Captures every team's total; an empty name becomes "Interval N"
    CreateInterval { name: String },
    RemoveInterval { id: IntervalId },
    /// Sets one preference; turning negative points off removes every
    /// negative score event
    SetPreference { key: String, value: bool },
}

impl LocalMutation {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            LocalMutation::AddTeam { .. } => "add_team",
            LocalMutation::RemoveTeam { .. } => "remove_team",
            LocalMutation::RenameTeam { .. } => "rename_team",
            LocalMutation::RecolorTeam { .. } => "recolor_team",
            LocalMutation::Increment { .. } => "increment",
            LocalMutation::Decrement { .. } => "decrement",
            LocalMutation::CreateInterval { .. } => "create_interval",
            LocalMutation::RemoveInterval { .. } => "remove_interval",
            LocalMutation::SetPreference { .. } => "set_preference",
        }
    }
}

/// What a mutation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationEffect {
    pub teams_changed: bool,
    pub intervals_changed: bool,
    /// Preferences to apply once the transaction has committed
    pub preferences: Option<PreferenceSet>,
}

impl MutationEffect {
    pub fn is_empty(&self) -> bool {
        !self.teams_changed && !self.intervals_changed && self.preferences.is_none()
    }

    fn teams() -> Self {
        Self {
            teams_changed: true,
            ..Self::default()
        }
    }

    fn intervals() -> Self {
        Self {
            intervals_changed: true,
            ..Self::default()
        }
    }
}

async fn find_team(tx: &mut dyn IStoreTransaction, id: &TeamId) -> Result<Team, SyncError> {
    tx.fetch_teams()
        .await?
        .into_iter()
        .find(|t| t.id() == id)
        .ok_or_else(|| DomainError::TeamNotFound(id.to_string()).into())
}

/// Applies `mutation` through `tx`
///
/// `current` is the device's preference set before the edit.
pub async fn apply_mutation(
    tx: &mut dyn IStoreTransaction,
    current: &PreferenceSet,
    mutation: LocalMutation,
) -> Result<MutationEffect, SyncError> {
    match mutation {
        LocalMutation::AddTeam { name, color } => {
            let team = Team::new(name, color.unwrap_or_else(ColorHex::random));
            tx.insert_team(&team).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::RemoveTeam { id } => {
            let teams = tx.fetch_teams().await?;
            if !teams.iter().any(|t| t.id() == &id) {
                return Err(DomainError::TeamNotFound(id.to_string()).into());
            }
            if teams.len() <= MIN_TEAMS {
                return Err(DomainError::BelowMinimumTeams {
                    min: MIN_TEAMS,
                    remaining: teams.len() - 1,
                }
                .into());
            }
            tx.delete_team(&id).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::RenameTeam { id, name } => {
            let mut team = find_team(tx, &id).await?;
            if team.name() == name {
                return Ok(MutationEffect::default());
            }
            team.set_name(name);
            tx.update_team(&team).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::RecolorTeam { id, color } => {
            let mut team = find_team(tx, &id).await?;
            if team.color() == &color {
                return Ok(MutationEffect::default());
            }
            team.set_color(color);
            tx.update_team(&team).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::Increment { id } => {
            let mut team = find_team(tx, &id).await?;
            team.increment();
            tx.update_team(&team).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::Decrement { id } => {
            let mut team = find_team(tx, &id).await?;
            if !team.decrement(current.allow_negative_points()) {
                debug!(team_id = %id, "Nothing to undo");
                return Ok(MutationEffect::default());
            }
            tx.update_team(&team).await?;
            Ok(MutationEffect::teams())
        }

        LocalMutation::CreateInterval { name } => {
            let teams = tx.fetch_teams().await?;
            let name = if name.trim().is_empty() {
                let count = tx.fetch_intervals().await?.len();
                format!("Interval {}", count + 1)
            } else {
                name
            };
            tx.insert_interval(&Interval::capture(name, &teams)).await?;
            Ok(MutationEffect::intervals())
        }

        LocalMutation::RemoveInterval { id } => {
            let intervals = tx.fetch_intervals().await?;
            if !intervals.iter().any(|i| i.id() == &id) {
                return Err(DomainError::IntervalNotFound(id.to_string()).into());
            }
            tx.delete_interval(&id).await?;
            Ok(MutationEffect::intervals())
        }

        LocalMutation::SetPreference { key, value } => {
            if current.get(&key) == Some(value) {
                return Ok(MutationEffect::default());
            }
            let mut effect = MutationEffect {
                preferences: Some(PreferenceSet::new().with(key.clone(), value)),
                ..MutationEffect::default()
            };
            if key == ALLOW_NEGATIVE_POINTS && !value {
                effect.teams_changed = strip_negative_scores(tx).await?;
            }
            Ok(effect)
        }
    }
}

async fn strip_negative_scores(tx: &mut dyn IStoreTransaction) -> Result<bool, SyncError> {
    let mut changed = false;
    for mut team in tx.fetch_teams().await? {
        if team.strip_negative_scores() {
            tx.update_team(&team).await?;
            changed = true;
        }
    }
    Ok(changed)
}

// ============================================================================
// Command handlers
// ============================================================================

/// Clears every team's score events. Returns whether anything changed.
pub async fn reset_scores(tx: &mut dyn IStoreTransaction) -> Result<bool, SyncError> {
    let mut changed = false;
    for mut team in tx.fetch_teams().await? {
        if team.score().is_empty() {
            continue;
        }
        team.reset_score();
        tx.update_team(&team).await?;
        changed = true;
    }
    Ok(changed)
}

/// Deletes every team and interval and recreates the default teams
pub async fn reinitialize(tx: &mut dyn IStoreTransaction) -> Result<(), SyncError> {
    for team in tx.fetch_teams().await? {
        tx.delete_team(team.id()).await?;
    }
    for interval in tx.fetch_intervals().await? {
        tx.delete_interval(interval.id()).await?;
    }
    for team in Team::defaults() {
        tx.insert_team(&team).await?;
    }
    Ok(())
}

/// Seeds the default teams into an empty store
///
/// Returns whether anything was written.
pub async fn ensure_default_teams(store: &dyn IRecordStore) -> Result<bool, SyncError> {
    let mut tx = store.begin().await?;
    if !tx.fetch_teams().await?.is_empty() {
        return Ok(false);
    }
    for team in Team::defaults() {
        tx.insert_team(&team).await?;
    }
    tx.commit().await?;
    Ok(true)
}
