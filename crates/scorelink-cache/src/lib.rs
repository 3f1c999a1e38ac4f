//! ScoreLink Cache - Record store adapters
//!
//! Persistent and in-memory storage for:
//! - Teams and their score events
//! - Intervals and their team snapshots
//! - Synchronized preferences (in-memory only)
//!
//! ## Architecture
//!
//! This crate implements the `IRecordStore` and `IPreferenceStore` ports from
//! `scorelink-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteRecordStore`] - `IRecordStore` over a real SQL transaction
//! - [`MemoryRecordStore`] - Copy-on-begin store that counts committed writes
//! - [`MemoryPreferenceStore`] - `IPreferenceStore` backed by a `watch` channel
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use scorelink_cache::{DatabasePool, SqliteRecordStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/scorelink/scoreboard.db")).await?;
//! let store = SqliteRecordStore::new(pool.pool().clone());
//! // Use store as IRecordStore...
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod pool;
pub mod repository;

pub use memory::{MemoryPreferenceStore, MemoryRecordStore};
pub use pool::DatabasePool;
pub use repository::SqliteRecordStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A commit was refused (injected by the in-memory store)
    #[error("Commit failed: {0}")]
    CommitFailed(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
