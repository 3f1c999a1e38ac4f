//! ScoreLink Reconcile - Applying peer snapshots to the local store
//!
//! Provides:
//! - The no-op guard that stops update echo between peers
//! - Positional count alignment (append / delete trailing records)
//! - Overwrite-by-position of the aligned records
//! - A single atomic commit per incoming snapshot
//!
//! Preferences are not reconciled; they are applied directly by the
//! coordinator.

pub mod engine;
pub mod error;
pub mod plan;

pub use engine::{CollectionChange, ReconcileOutcome, ReconciliationEngine};
pub use error::ReconcileError;
pub use plan::{
    intervals_need_update, plan_intervals, plan_teams, teams_need_update, CollectionPlan,
};
