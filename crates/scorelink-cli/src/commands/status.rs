//! Status command - Display the scoreboard held on this device
//!
//! Opens the SQLite store named in the configuration and prints every team
//! with its score, plus intervals when they are enabled.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use scorelink_cache::{DatabasePool, SqliteRecordStore};
use scorelink_core::config::Config;
use scorelink_core::domain::preferences::{ALLOW_NEGATIVE_POINTS, INTERVALS_ENABLED};
use scorelink_core::domain::{Interval, PreferenceSet, Team};
use scorelink_core::ports::IRecordStore;

use crate::board;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Show scores below zero instead of flooring them
    #[arg(long)]
    pub allow_negative: bool,

    /// Include intervals in the listing
    #[arg(long)]
    pub intervals: bool,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let formatter = get_formatter(format);
        let db_path = &config.store.database;

        if !db_path.exists() {
            formatter.error(&format!(
                "No scoreboard database at {}. Run 'scorelink simulate --database {}' to create one.",
                db_path.display(),
                db_path.display()
            ));
            return Ok(());
        }

        let (teams, intervals) = read_board(db_path).await?;
        info!(teams = teams.len(), intervals = intervals.len(), "Loaded scoreboard");

        let prefs = PreferenceSet::new()
            .with(ALLOW_NEGATIVE_POINTS, self.allow_negative)
            .with(INTERVALS_ENABLED, self.intervals);

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "database": db_path.display().to_string(),
                "teams": teams,
                "intervals": intervals,
            }));
            return Ok(());
        }

        formatter.section(
            &format!("Scoreboard ({})", db_path.display()),
            &board::render(&teams, &intervals, &prefs),
        );
        Ok(())
    }
}

/// Reads every team and interval from the store at `db_path`
pub async fn read_board(db_path: &Path) -> Result<(Vec<Team>, Vec<Interval>)> {
    let pool = DatabasePool::new(db_path)
        .await
        .context("Failed to open database")?;
    let store = SqliteRecordStore::new(pool.pool().clone());

    let mut tx = store.begin().await.context("Failed to open transaction")?;
    let teams = tx.fetch_teams().await.context("Failed to read teams")?;
    let intervals = tx
        .fetch_intervals()
        .await
        .context("Failed to read intervals")?;
    Ok((teams, intervals))
}
