//! ScoreLink Sync - Per-device sync coordinator
//!
//! Provides:
//! - One coordinator actor per device, parameterized by [`Role`](scorelink_core::domain::Role)
//! - Initial push from the primary after a settle delay
//! - Replication of full snapshots after every local change
//! - One-shot commands that are never echoed back
//! - A broadcast event bus for UI refreshes
//!
//! ## Modules
//!
//! - [`coordinator`] - The actor and its [`CoordinatorHandle`]
//! - [`events`] - [`SyncEvent`] values published on the bus
//! - [`mutation`] - Local edits and command handlers

pub mod coordinator;
pub mod events;
pub mod mutation;
mod outbox;

use thiserror::Error;

pub use coordinator::{BoardSnapshot, CoordinatorHandle, SyncCoordinator};
pub use events::{ChangeOrigin, SyncEvent};
pub use mutation::LocalMutation;

/// Errors returned to callers of the coordinator handle
#[derive(Debug, Error)]
pub enum SyncError {
    /// The coordinator task has stopped
    #[error("coordinator is not running")]
    CoordinatorStopped,

    /// A domain rule rejected the request
    #[error("Domain error: {0}")]
    Domain(#[from] scorelink_core::domain::DomainError),

    /// The store failed; nothing was committed
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
