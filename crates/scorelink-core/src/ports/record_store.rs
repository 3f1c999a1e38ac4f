//! Record store port (driven/secondary port)
//!
//! This module defines the interface to the device's persistent store of
//! teams and intervals. Every read and write happens inside a transaction
//! opened with [`IRecordStore::begin`].
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory, ...) and don't need domain-level classification.
//! - Fetches return records in creation order. That order is what the
//!   peer protocol matches on, so adapters must keep it stable for records
//!   created within the same instant.
//! - A transaction that is dropped without [`IStoreTransaction::commit`]
//!   discards all of its writes.

use crate::domain::{Interval, IntervalId, Team, TeamId};

/// An open unit of work against the record store
#[async_trait::async_trait]
pub trait IStoreTransaction: Send {
    /// Returns all teams in creation order
    async fn fetch_teams(&mut self) -> anyhow::Result<Vec<Team>>;

    /// Returns all intervals in creation order
    async fn fetch_intervals(&mut self) -> anyhow::Result<Vec<Interval>>;

    /// Inserts a new team; it sorts after every existing team with the
    /// same creation time
    async fn insert_team(&mut self, team: &Team) -> anyhow::Result<()>;

    /// Overwrites an existing team identified by its id
    async fn update_team(&mut self, team: &Team) -> anyhow::Result<()>;

    /// Deletes a team
    async fn delete_team(&mut self, id: &TeamId) -> anyhow::Result<()>;

    /// Inserts a new interval
    async fn insert_interval(&mut self, interval: &Interval) -> anyhow::Result<()>;

    /// Overwrites an existing interval identified by its id
    async fn update_interval(&mut self, interval: &Interval) -> anyhow::Result<()>;

    /// Deletes an interval
    async fn delete_interval(&mut self, id: &IntervalId) -> anyhow::Result<()>;

    /// Makes all writes of this transaction durable, atomically
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

/// Port trait for the transactional record store
#[async_trait::async_trait]
pub trait IRecordStore: Send + Sync {
    /// Opens a new transaction
    async fn begin(&self) -> anyhow::Result<Box<dyn IStoreTransaction>>;
}
