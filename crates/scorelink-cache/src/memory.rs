//! In-memory adapters
//!
//! [`MemoryRecordStore`] keeps teams and intervals in vectors behind an async
//! mutex. A transaction holds the lock for its whole lifetime and works on a
//! private copy, so dropping it without commit leaves the store untouched.
//! Committed writes are counted, which lets tests assert that a no-op
//! reconciliation touched nothing.
//!
//! [`MemoryPreferenceStore`] keeps preferences in a `watch` channel so UI
//! code can observe changes.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use scorelink_core::domain::{Interval, IntervalId, PreferenceSet, Team, TeamId};
use scorelink_core::ports::{IPreferenceStore, IRecordStore, IStoreTransaction};

use crate::CacheError;

// ============================================================================
// MemoryRecordStore
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Records {
    teams: Vec<Team>,
    intervals: Vec<Interval>,
}

#[derive(Debug, Default)]
struct Shared {
    records: Records,
    write_count: u64,
    commit_count: u64,
    fail_next_commit: bool,
    fail_next_begin: bool,
}

/// Transactional in-memory record store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records; seeding is not counted
    /// as writes
    pub fn with_records(teams: Vec<Team>, intervals: Vec<Interval>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                records: Records { teams, intervals },
                ..Shared::default()
            })),
        }
    }

    /// Committed teams in creation order
    pub async fn teams(&self) -> Vec<Team> {
        creation_order(&self.shared.lock().await.records.teams, Team::created_at)
    }

    /// Committed intervals in creation order
    pub async fn intervals(&self) -> Vec<Interval> {
        creation_order(&self.shared.lock().await.records.intervals, Interval::created_at)
    }

    /// Total inserts, updates and deletes made durable so far
    pub async fn write_count(&self) -> u64 {
        self.shared.lock().await.write_count
    }

    /// Number of successful commits, including empty ones
    pub async fn commit_count(&self) -> u64 {
        self.shared.lock().await.commit_count
    }

    /// Makes the next commit fail and discard its writes
    pub async fn fail_next_commit(&self) {
        self.shared.lock().await.fail_next_commit = true;
    }

    /// Makes the next `begin` fail without opening a transaction
    pub async fn fail_next_begin(&self) {
        self.shared.lock().await.fail_next_begin = true;
    }
}

fn creation_order<T: Clone>(
    records: &[T],
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> Vec<T> {
    let mut sorted = records.to_vec();
    // Stable: records created in the same instant keep insertion order.
    sorted.sort_by_key(|r| created_at(r));
    sorted
}

#[async_trait::async_trait]
impl IRecordStore for MemoryRecordStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn IStoreTransaction>> {
        let mut guard = self.shared.clone().lock_owned().await;
        if guard.fail_next_begin {
            guard.fail_next_begin = false;
            return Err(CacheError::ConnectionFailed("injected failure".to_string()).into());
        }
        let working = guard.records.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            writes: 0,
        }))
    }
}

/// Open transaction on a [`MemoryRecordStore`]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Shared>,
    working: Records,
    writes: u64,
}

#[async_trait::async_trait]
impl IStoreTransaction for MemoryTransaction {
    async fn fetch_teams(&mut self) -> anyhow::Result<Vec<Team>> {
        Ok(creation_order(&self.working.teams, Team::created_at))
    }

    async fn fetch_intervals(&mut self) -> anyhow::Result<Vec<Interval>> {
        Ok(creation_order(&self.working.intervals, Interval::created_at))
    }

    async fn insert_team(&mut self, team: &Team) -> anyhow::Result<()> {
        self.working.teams.push(team.clone());
        self.writes += 1;
        Ok(())
    }

    async fn update_team(&mut self, team: &Team) -> anyhow::Result<()> {
        let existing = self
            .working
            .teams
            .iter_mut()
            .find(|t| t.id() == team.id())
            .ok_or_else(|| CacheError::QueryFailed(format!("team {} not found", team.id())))?;

        existing.set_name(team.name());
        existing.set_color(team.color().clone());
        existing.set_score(team.score().to_vec());
        self.writes += 1;
        Ok(())
    }

    async fn delete_team(&mut self, id: &TeamId) -> anyhow::Result<()> {
        let before = self.working.teams.len();
        self.working.teams.retain(|t| t.id() != id);
        if self.working.teams.len() == before {
            return Err(CacheError::QueryFailed(format!("team {} not found", id)).into());
        }
        self.writes += 1;
        Ok(())
    }

    async fn insert_interval(&mut self, interval: &Interval) -> anyhow::Result<()> {
        self.working.intervals.push(interval.clone());
        self.writes += 1;
        Ok(())
    }

    async fn update_interval(&mut self, interval: &Interval) -> anyhow::Result<()> {
        let existing = self
            .working
            .intervals
            .iter_mut()
            .find(|i| i.id() == interval.id())
            .ok_or_else(|| {
                CacheError::QueryFailed(format!("interval {} not found", interval.id()))
            })?;

        *existing = interval.clone();
        self.writes += 1;
        Ok(())
    }

    async fn delete_interval(&mut self, id: &IntervalId) -> anyhow::Result<()> {
        let before = self.working.intervals.len();
        self.working.intervals.retain(|i| i.id() != id);
        if self.working.intervals.len() == before {
            return Err(CacheError::QueryFailed(format!("interval {} not found", id)).into());
        }
        self.writes += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTransaction {
            mut guard,
            working,
            writes,
        } = *self;

        if guard.fail_next_commit {
            guard.fail_next_commit = false;
            tracing::debug!(writes, "Injected commit failure, discarding writes");
            return Err(CacheError::CommitFailed("injected failure".to_string()).into());
        }

        guard.records = working;
        guard.write_count += writes;
        guard.commit_count += 1;
        Ok(())
    }
}

// ============================================================================
// MemoryPreferenceStore
// ============================================================================

/// Preference store kept in memory
///
/// Cloning yields another handle to the same preferences.
#[derive(Debug, Clone)]
pub struct MemoryPreferenceStore {
    tx: Arc<watch::Sender<PreferenceSet>>,
}

impl MemoryPreferenceStore {
    pub fn new(initial: PreferenceSet) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver notified after every [`IPreferenceStore::apply`]
    pub fn subscribe(&self) -> watch::Receiver<PreferenceSet> {
        self.tx.subscribe()
    }
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new(PreferenceSet::new())
    }
}

impl IPreferenceStore for MemoryPreferenceStore {
    fn snapshot(&self) -> PreferenceSet {
        self.tx.borrow().clone()
    }

    fn apply(&self, incoming: &PreferenceSet) {
        self.tx.send_modify(|prefs| prefs.merge_from(incoming));
    }
}
