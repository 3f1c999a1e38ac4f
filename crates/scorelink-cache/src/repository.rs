//! SQLite implementation of IRecordStore
//!
//! Each [`IRecordStore::begin`] opens a real SQL transaction; dropping the
//! returned handle without committing rolls it back.
//!
//! ## Type Mapping
//!
//! | Domain Type          | SQL Type | Strategy                              |
//! |----------------------|----------|---------------------------------------|
//! | TeamId, IntervalId   | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | DateTime<Utc>        | INTEGER  | epoch milliseconds                    |
//! | ColorHex             | TEXT     | `.as_str()` / `ColorHex::from_wire()` |
//! | Vec<ScoreEvent>      | TEXT     | serde_json array                      |
//! | Vec<TeamSnapshot>    | TEXT     | serde_json array                      |
//!
//! Records are returned ordered by `(created_at, seq)`. `seq` is assigned on
//! insert and only breaks ties between records created in the same
//! millisecond.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use scorelink_core::domain::{
    ColorHex, Interval, IntervalId, ScoreEvent, Team, TeamId, TeamSnapshot,
};
use scorelink_core::ports::{IRecordStore, IStoreTransaction};

use crate::CacheError;

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IRecordStore for SqliteRecordStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn IStoreTransaction>> {
        let tx = self.pool.begin().await.map_err(CacheError::from)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// An open SQL transaction against the scoreboard tables
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_millis(ms: i64) -> Result<DateTime<Utc>, CacheError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CacheError::SerializationError(format!("Timestamp out of range: {}", ms)))
}

fn team_from_row(row: &SqliteRow) -> Result<Team, CacheError> {
    let id_str: String = row.try_get("id")?;
    let created_at: i64 = row.try_get("created_at")?;
    let name: String = row.try_get("name")?;
    let color: String = row.try_get("color")?;
    let score_json: String = row.try_get("score")?;

    let id = TeamId::from_str(&id_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid team id: {}", e)))?;
    let score: Vec<ScoreEvent> = serde_json::from_str(&score_json)?;

    Ok(Team::restore(
        id,
        parse_millis(created_at)?,
        name,
        ColorHex::from_wire(color),
        score,
    ))
}

fn interval_from_row(row: &SqliteRow) -> Result<Interval, CacheError> {
    let id_str: String = row.try_get("id")?;
    let created_at: i64 = row.try_get("created_at")?;
    let name: String = row.try_get("name")?;
    let snapshots_json: String = row.try_get("snapshots")?;

    let id = IntervalId::from_str(&id_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid interval id: {}", e)))?;
    let snapshots: Vec<TeamSnapshot> = serde_json::from_str(&snapshots_json)?;

    Ok(Interval::restore(
        id,
        name,
        parse_millis(created_at)?,
        snapshots,
    ))
}

fn ensure_affected(rows: u64, what: &str, id: &str) -> Result<(), CacheError> {
    if rows == 0 {
        return Err(CacheError::QueryFailed(format!("{} {} not found", what, id)));
    }
    Ok(())
}

// ============================================================================
// IStoreTransaction implementation
// ============================================================================

#[async_trait::async_trait]
impl IStoreTransaction for SqliteTransaction {
    async fn fetch_teams(&mut self) -> anyhow::Result<Vec<Team>> {
        let rows = sqlx::query("SELECT * FROM teams ORDER BY created_at ASC, seq ASC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(CacheError::from)?;

        let teams = rows
            .iter()
            .map(team_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    async fn fetch_intervals(&mut self) -> anyhow::Result<Vec<Interval>> {
        let rows = sqlx::query("SELECT * FROM intervals ORDER BY created_at ASC, seq ASC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(CacheError::from)?;

        let intervals = rows
            .iter()
            .map(interval_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(intervals)
    }

    async fn insert_team(&mut self, team: &Team) -> anyhow::Result<()> {
        let score = serde_json::to_string(team.score()).map_err(CacheError::from)?;

        sqlx::query(
            r#"INSERT INTO teams (id, seq, created_at, name, color, score)
               VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM teams), ?, ?, ?, ?)"#,
        )
        .bind(team.id().to_string())
        .bind(team.created_at().timestamp_millis())
        .bind(team.name())
        .bind(team.color().as_str())
        .bind(score)
        .execute(&mut *self.tx)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(team_id = %team.id(), name = team.name(), "Inserted team");
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> anyhow::Result<()> {
        let score = serde_json::to_string(team.score()).map_err(CacheError::from)?;
        let id = team.id().to_string();

        let result = sqlx::query("UPDATE teams SET name = ?, color = ?, score = ? WHERE id = ?")
            .bind(team.name())
            .bind(team.color().as_str())
            .bind(score)
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(CacheError::from)?;

        ensure_affected(result.rows_affected(), "team", &id)?;
        tracing::trace!(team_id = %id, "Updated team");
        Ok(())
    }

    async fn delete_team(&mut self, id: &TeamId) -> anyhow::Result<()> {
        let id = id.to_string();
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(CacheError::from)?;

        ensure_affected(result.rows_affected(), "team", &id)?;
        tracing::trace!(team_id = %id, "Deleted team");
        Ok(())
    }

    async fn insert_interval(&mut self, interval: &Interval) -> anyhow::Result<()> {
        let snapshots = serde_json::to_string(interval.snapshots()).map_err(CacheError::from)?;

        sqlx::query(
            r#"INSERT INTO intervals (id, seq, created_at, name, snapshots)
               VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM intervals), ?, ?, ?)"#,
        )
        .bind(interval.id().to_string())
        .bind(interval.created_at().timestamp_millis())
        .bind(interval.name())
        .bind(snapshots)
        .execute(&mut *self.tx)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(interval_id = %interval.id(), name = interval.name(), "Inserted interval");
        Ok(())
    }

    async fn update_interval(&mut self, interval: &Interval) -> anyhow::Result<()> {
        let snapshots = serde_json::to_string(interval.snapshots()).map_err(CacheError::from)?;
        let id = interval.id().to_string();

        // An interval's date is part of its content.
        let result = sqlx::query(
            "UPDATE intervals SET name = ?, created_at = ?, snapshots = ? WHERE id = ?",
        )
        .bind(interval.name())
        .bind(interval.created_at().timestamp_millis())
        .bind(snapshots)
        .bind(&id)
        .execute(&mut *self.tx)
        .await
        .map_err(CacheError::from)?;

        ensure_affected(result.rows_affected(), "interval", &id)?;
        tracing::trace!(interval_id = %id, "Updated interval");
        Ok(())
    }

    async fn delete_interval(&mut self, id: &IntervalId) -> anyhow::Result<()> {
        let id = id.to_string();
        let result = sqlx::query("DELETE FROM intervals WHERE id = ?")
            .bind(&id)
            .execute(&mut *self.tx)
            .await
            .map_err(CacheError::from)?;

        ensure_affected(result.rows_affected(), "interval", &id)?;
        tracing::trace!(interval_id = %id, "Deleted interval");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await.map_err(CacheError::from)?;
        Ok(())
    }
}
