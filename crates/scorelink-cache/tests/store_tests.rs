//! Integration tests for SqliteRecordStore
//!
//! Each test opens a fresh in-memory database so tests stay isolated.

use chrono::{Duration, TimeZone, Utc};

use scorelink_cache::{DatabasePool, SqliteRecordStore};
use scorelink_core::domain::{ColorHex, Interval, ScoreEvent, Team, TeamSnapshot};
use scorelink_core::ports::IRecordStore;

// ============================================================================
// Test helpers
// ============================================================================

async fn setup() -> SqliteRecordStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteRecordStore::new(pool.pool().clone())
}

fn color(hex: &str) -> ColorHex {
    ColorHex::new(hex).unwrap()
}

fn team_with_score(name: &str, deltas: &[i32]) -> Team {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
    let score = deltas
        .iter()
        .enumerate()
        .map(|(i, d)| ScoreEvent::new(base + Duration::milliseconds(i as i64 * 1500 + 7), *d))
        .collect();
    Team::with_score(name, color("FF8800"), score)
}

async fn insert_teams(store: &SqliteRecordStore, teams: &[Team]) {
    let mut tx = store.begin().await.unwrap();
    for team in teams {
        tx.insert_team(team).await.unwrap();
    }
    tx.commit().await.unwrap();
}

// ============================================================================
// Team tests
// ============================================================================

#[tokio::test]
async fn test_insert_and_fetch_team_preserves_fields() {
    let store = setup().await;
    let team = team_with_score("Team A", &[1, 1, -1]);
    insert_teams(&store, &[team.clone()]).await;

    let mut tx = store.begin().await.unwrap();
    let teams = tx.fetch_teams().await.unwrap();
    assert_eq!(teams, vec![team]);
}

#[tokio::test]
async fn test_teams_created_in_same_instant_keep_insert_order() {
    let store = setup().await;
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let names = ["Team A", "Team B", "Team C", "Team D"];
    let teams: Vec<Team> = names
        .iter()
        .map(|n| Team::restore(Default::default(), at, n.to_string(), color("000000"), vec![]))
        .collect();
    insert_teams(&store, &teams).await;

    let mut tx = store.begin().await.unwrap();
    let fetched: Vec<String> = tx
        .fetch_teams()
        .await
        .unwrap()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(fetched, names);
}

#[tokio::test]
async fn test_teams_are_ordered_by_creation_time() {
    let store = setup().await;
    let early = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let late = early + Duration::hours(1);
    let second = Team::restore(Default::default(), late, "Second".into(), color("111111"), vec![]);
    let first = Team::restore(Default::default(), early, "First".into(), color("222222"), vec![]);
    insert_teams(&store, &[second, first]).await;

    let mut tx = store.begin().await.unwrap();
    let teams = tx.fetch_teams().await.unwrap();
    assert_eq!(teams[0].name(), "First");
    assert_eq!(teams[1].name(), "Second");
}

#[tokio::test]
async fn test_update_team_overwrites_content_not_identity() {
    let store = setup().await;
    let team = team_with_score("Team A", &[1]);
    insert_teams(&store, &[team.clone()]).await;

    let mut changed = team.clone();
    changed.set_name("Home");
    changed.set_color(color("00FF00"));
    changed.set_score(vec![]);

    let mut tx = store.begin().await.unwrap();
    tx.update_team(&changed).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let fetched = tx.fetch_teams().await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id(), team.id());
    assert_eq!(fetched[0].created_at(), team.created_at());
    assert_eq!(fetched[0].name(), "Home");
    assert_eq!(fetched[0].color().as_str(), "00FF00");
    assert!(fetched[0].score().is_empty());
}

#[tokio::test]
async fn test_update_missing_team_fails() {
    let store = setup().await;
    let mut tx = store.begin().await.unwrap();
    assert!(tx.update_team(&team_with_score("Ghost", &[])).await.is_err());
}

#[tokio::test]
async fn test_delete_team() {
    let store = setup().await;
    let a = team_with_score("Team A", &[]);
    let b = team_with_score("Team B", &[]);
    insert_teams(&store, &[a.clone(), b.clone()]).await;

    let mut tx = store.begin().await.unwrap();
    tx.delete_team(b.id()).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let teams = tx.fetch_teams().await.unwrap();
    assert_eq!(teams, vec![a]);
}

// ============================================================================
// Transaction semantics
// ============================================================================

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let store = setup().await;
    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_team(&team_with_score("Team A", &[1])).await.unwrap();
        // dropped without commit
    }

    let mut tx = store.begin().await.unwrap();
    assert!(tx.fetch_teams().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_inside_transaction_see_own_writes() {
    let store = setup().await;
    let mut tx = store.begin().await.unwrap();
    tx.insert_team(&team_with_score("Team A", &[])).await.unwrap();
    assert_eq!(tx.fetch_teams().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoreboard.db");
    let team = team_with_score("Team A", &[1, 1]);

    {
        let pool = DatabasePool::new(&path).await.unwrap();
        let store = SqliteRecordStore::new(pool.pool().clone());
        insert_teams(&store, &[team.clone()]).await;
        pool.pool().close().await;
    }

    let pool = DatabasePool::new(&path).await.unwrap();
    let store = SqliteRecordStore::new(pool.pool().clone());
    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.fetch_teams().await.unwrap(), vec![team]);
}

// ============================================================================
// Interval tests
// ============================================================================

#[tokio::test]
async fn test_interval_round_trip_and_order() {
    let store = setup().await;
    let q1_at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 15, 0).unwrap();
    let q2_at = q1_at + Duration::minutes(15);
    let snapshot = |total| TeamSnapshot {
        team_name: "Team A".into(),
        team_color: color("FF0000"),
        total_score: total,
    };
    let q2 = Interval::new("Q2", q2_at, vec![snapshot(9)]);
    let q1 = Interval::new("Q1", q1_at, vec![snapshot(4)]);

    let mut tx = store.begin().await.unwrap();
    tx.insert_interval(&q2).await.unwrap();
    tx.insert_interval(&q1).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let intervals = tx.fetch_intervals().await.unwrap();
    assert_eq!(intervals, vec![q1, q2]);
}

#[tokio::test]
async fn test_update_and_delete_interval() {
    let store = setup().await;
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 15, 0).unwrap();
    let mut interval = Interval::new("Q1", at, vec![]);

    let mut tx = store.begin().await.unwrap();
    tx.insert_interval(&interval).await.unwrap();
    tx.commit().await.unwrap();

    interval.overwrite("Half".to_string(), at + Duration::seconds(1), vec![]);
    let mut tx = store.begin().await.unwrap();
    tx.update_interval(&interval).await.unwrap();
    let fetched = tx.fetch_intervals().await.unwrap();
    assert_eq!(fetched[0].name(), "Half");
    tx.delete_interval(interval.id()).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx.fetch_intervals().await.unwrap().is_empty());
}
