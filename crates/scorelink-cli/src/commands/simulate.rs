//! Simulate command - Scripted two-device session over a loopback link
//!
//! Runs a primary and a dependent coordinator in this process, joined by a
//! [`LoopbackTransport`] pair, and walks them through a short game:
//!
//! 1. Both devices start from the default teams and activate; the primary
//!    pushes its state after the settle delay.
//! 2. Each side scores in turn, then the primary enables intervals and
//!    captures one.
//! 3. The link drops; the dependent adds a team and scores while offline.
//! 4. The link comes back and the durable context catches the primary up.
//! 5. The primary resets all scores with a command.
//!
//! The primary keeps its records in SQLite (a file when `--database` is
//! given, memory otherwise); the dependent uses the in-memory store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use scorelink_cache::{DatabasePool, MemoryPreferenceStore, MemoryRecordStore, SqliteRecordStore};
use scorelink_core::config::{Config, SyncConfig};
use scorelink_core::domain::preferences::INTERVALS_ENABLED;
use scorelink_core::domain::{Command, Role, TeamId};
use scorelink_core::ports::{IPreferenceStore, IRecordStore};
use scorelink_sync::mutation::ensure_default_teams;
use scorelink_sync::{BoardSnapshot, CoordinatorHandle, LocalMutation, SyncCoordinator, SyncEvent};
use scorelink_transport::{DeliveryOutcome, LoopbackTransport};

use crate::board;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Keep the primary's records in this SQLite file
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Override the primary's settle delay (milliseconds)
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Seconds to wait for the devices to converge after each step
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
}

struct Device {
    handle: CoordinatorHandle,
    transport: LoopbackTransport,
    events: broadcast::Receiver<SyncEvent>,
    task: tokio::task::JoinHandle<()>,
}

fn start_device(
    role: Role,
    store: Arc<dyn IRecordStore>,
    transport: LoopbackTransport,
    config: &SyncConfig,
    shutdown: &CancellationToken,
) -> Device {
    let prefs: Arc<dyn IPreferenceStore> = Arc::new(MemoryPreferenceStore::default());
    let (coordinator, handle) = SyncCoordinator::new(
        role,
        store,
        Arc::new(transport.clone()),
        prefs,
        config,
    );
    transport.attach(handle.transport_sink());
    let events = handle.subscribe();
    let task = tokio::spawn(coordinator.run(shutdown.clone()));
    Device {
        handle,
        transport,
        events,
        task,
    }
}

/// What the peer protocol compares: positions, names, colors, event counts
fn fingerprint(board: &BoardSnapshot) -> (Vec<(String, String, usize)>, Vec<String>) {
    let teams = board
        .teams
        .iter()
        .map(|t| (t.name().to_string(), t.color().to_string(), t.score().len()))
        .collect();
    let intervals = board
        .intervals
        .iter()
        .map(|i| i.name().to_string())
        .collect();
    (teams, intervals)
}

async fn converge(a: &CoordinatorHandle, b: &CoordinatorHandle, timeout: Duration) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let (left, right) = (a.snapshot().await?, b.snapshot().await?);
        if fingerprint(&left) == fingerprint(&right) && left.preferences == right.preferences {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(Duration::from_millis(20)).await;
    }
}

async fn team_id(handle: &CoordinatorHandle, position: usize) -> Result<TeamId> {
    let board = handle.snapshot().await?;
    match board.teams.get(position) {
        Some(team) => Ok(*team.id()),
        None => bail!("no team at position {}", position),
    }
}

#[derive(Debug, Default, serde::Serialize)]
struct DeliveryCounts {
    live: u64,
    durable: u64,
    dropped: u64,
}

fn count_deliveries(events: &mut broadcast::Receiver<SyncEvent>) -> DeliveryCounts {
    let mut counts = DeliveryCounts::default();
    loop {
        match events.try_recv() {
            Ok(SyncEvent::Delivered { outcome, .. }) => match outcome {
                DeliveryOutcome::Live => counts.live += 1,
                DeliveryOutcome::Durable => counts.durable += 1,
                DeliveryOutcome::Dropped => counts.dropped += 1,
            },
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    counts
}

impl SimulateCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let formatter = get_formatter(format);
        let wait = Duration::from_secs(self.timeout);

        let mut sync_config = config.sync.clone();
        if let Some(ms) = self.settle_ms {
            sync_config.settle_delay_ms = ms;
        }

        let pool = match &self.database {
            Some(path) => DatabasePool::new(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
            None => DatabasePool::in_memory()
                .await
                .context("Failed to create in-memory database")?,
        };
        let primary_store: Arc<dyn IRecordStore> =
            Arc::new(SqliteRecordStore::new(pool.pool().clone()));
        let dependent_store: Arc<dyn IRecordStore> = Arc::new(MemoryRecordStore::new());
        ensure_default_teams(primary_store.as_ref()).await?;
        ensure_default_teams(dependent_store.as_ref()).await?;

        let shutdown = CancellationToken::new();
        let (link_a, link_b) = LoopbackTransport::pair();
        let mut primary = start_device(Role::Primary, primary_store, link_a, &sync_config, &shutdown);
        let mut dependent =
            start_device(Role::Dependent, dependent_store, link_b, &sync_config, &shutdown);

        let mut steps: Vec<(String, bool)> = Vec::new();
        let (p, d) = (primary.handle.clone(), dependent.handle.clone());

        info!("Activating both sessions");
        dependent.transport.activate();
        primary.transport.activate();
        steps.push(("initial push from primary".into(), converge(&p, &d, wait).await?));

        // Each side waits for the other's snapshot before editing; matching is
        // positional, so concurrent edits to the same board would overwrite.
        p.mutate(LocalMutation::Increment { id: team_id(&p, 0).await? }).await?;
        p.mutate(LocalMutation::Increment { id: team_id(&p, 0).await? }).await?;
        steps.push(("primary scores".into(), converge(&p, &d, wait).await?));
        d.mutate(LocalMutation::Increment { id: team_id(&d, 1).await? }).await?;
        steps.push(("dependent scores".into(), converge(&p, &d, wait).await?));

        p.mutate(LocalMutation::SetPreference {
            key: INTERVALS_ENABLED.into(),
            value: true,
        })
        .await?;
        p.mutate(LocalMutation::CreateInterval { name: String::new() }).await?;
        steps.push(("interval captured".into(), converge(&p, &d, wait).await?));

        info!("Dropping the link");
        primary.transport.set_reachable(false);
        d.mutate(LocalMutation::AddTeam {
            name: "Team C".into(),
            color: None,
        })
        .await?;
        d.mutate(LocalMutation::Increment { id: team_id(&d, 2).await? }).await?;
        let offline_teams = p.snapshot().await?.teams.len();
        steps.push((
            format!("offline edits held back (primary sees {offline_teams} teams)"),
            offline_teams == 2,
        ));

        info!("Restoring the link");
        primary.transport.set_reachable(true);
        steps.push(("durable context delivered on reconnect".into(), converge(&p, &d, wait).await?));

        p.send_command(Command::ResetScores).await?;
        steps.push(("reset command applied on both".into(), converge(&p, &d, wait).await?));

        let primary_board = p.snapshot().await?;
        let dependent_board = d.snapshot().await?;

        shutdown.cancel();
        primary.task.await.context("Primary coordinator panicked")?;
        dependent.task.await.context("Dependent coordinator panicked")?;
        let primary_deliveries = count_deliveries(&mut primary.events);
        let dependent_deliveries = count_deliveries(&mut dependent.events);

        let converged = steps.iter().all(|(_, ok)| *ok);
        info!(converged, "Simulation finished");

        if format.is_json() {
            let steps_json: Vec<_> = steps
                .iter()
                .map(|(name, ok)| serde_json::json!({"step": name, "ok": ok}))
                .collect();
            formatter.print_json(&serde_json::json!({
                "converged": converged,
                "steps": steps_json,
                "primary": {
                    "board": primary_board,
                    "deliveries": primary_deliveries,
                    "messages_sent": primary.transport.messages_sent(),
                    "context_writes": primary.transport.context_writes(),
                },
                "dependent": {
                    "board": dependent_board,
                    "deliveries": dependent_deliveries,
                    "messages_sent": dependent.transport.messages_sent(),
                    "context_writes": dependent.transport.context_writes(),
                },
            }));
            return Ok(());
        }

        for (name, ok) in &steps {
            formatter.step(name, *ok);
        }
        if !converged {
            formatter.error("Devices did not converge at every step");
        }
        for (label, board_state, deliveries) in [
            ("Primary", &primary_board, &primary_deliveries),
            ("Dependent", &dependent_board, &dependent_deliveries),
        ] {
            let title = format!(
                "{label} board (deliveries: {} live, {} durable, {} dropped)",
                deliveries.live, deliveries.durable, deliveries.dropped
            );
            let lines = board::render(
                &board_state.teams,
                &board_state.intervals,
                &board_state.preferences,
            );
            formatter.section(&title, &lines);
        }
        if let Some(path) = &self.database {
            formatter.section("Primary records saved to", &[path.display().to_string()]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulation_converges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.db");
        let cmd = SimulateCommand {
            database: Some(path.clone()),
            settle_ms: Some(10),
            timeout: 5,
        };

        cmd.execute(OutputFormat::Json, &Config::default()).await.unwrap();

        let (teams, intervals) = crate::commands::status::read_board(&path).await.unwrap();
        assert_eq!(teams.len(), 3);
        assert!(teams.iter().all(|t| t.score().is_empty()));
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].name(), "Interval 1");
    }
}
