//! Domain entities and business logic
//!
//! This module contains the core domain types for ScoreLink:
//! - Newtypes for record identifiers and colors
//! - Teams and their score events
//! - Intervals and team snapshots
//! - Synchronized preferences
//! - Peer commands, notifications and roles
//! - Domain-specific error types

pub mod errors;
pub mod interval;
pub mod message;
pub mod newtypes;
pub mod preferences;
pub mod team;

// Re-export commonly used types
pub use errors::DomainError;
pub use interval::{Interval, TeamSnapshot};
pub use message::{Command, Notification, Role};
pub use newtypes::*;
pub use preferences::PreferenceSet;
pub use team::{ScoreEvent, Team, MIN_TEAMS};
