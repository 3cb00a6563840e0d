// SQLite store and registry tests: init, upsert, range, purge, latest, aggregate reading

use chrono::{Days, NaiveDate};
use fleetstats::db;
use fleetstats::models::*;
use fleetstats::registry::{DeviceRegistry, SqliteDeviceRegistry};
use fleetstats::snapshot_repo::{SnapshotStore, SqliteSnapshotRepo};
use fleetstats::stats_computer::StatsComputer;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(n))
        .unwrap()
}

fn snapshot(date: NaiveDate, online: u64, offline: u64, perf: i64) -> FleetSnapshot {
    let status_counts = StatusCounts {
        online,
        offline,
        error: 0,
        maintenance: 0,
    };
    FleetSnapshot {
        status_counts,
        total: status_counts.sum(),
        avg_performance: Performance::from_hundredths(perf),
        trends: Trends::default(),
        stats_date: date,
        created_at: None,
        updated_at: None,
    }
}

async fn open(dir: &TempDir) -> sqlx::SqlitePool {
    let path = dir.path().join("fleetstats.db");
    db::connect(path.to_str().unwrap(), 2).await.unwrap()
}

async fn repo(dir: &TempDir) -> SqliteSnapshotRepo {
    let repo = SqliteSnapshotRepo::new(open(dir).await);
    repo.init().await.unwrap();
    repo
}

#[tokio::test]
async fn snapshot_repo_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert!(repo.latest().await.unwrap().is_none());
}

#[tokio::test]
async fn connect_creates_missing_parent_dir() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("stats.db");
    db::connect(path.to_str().unwrap(), 1).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn snapshot_repo_upsert_and_get_by_date() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;

    let mut s = snapshot(day(3), 8, 2, 8725);
    s.trends = Trends {
        online: 2,
        offline: -1,
        error: 0,
        performance: -4,
    };
    let stored = repo.upsert(&s).await.unwrap();
    assert_eq!(stored.online, Some(8));
    assert_eq!(stored.total, Some(10));
    assert_eq!(stored.avg_performance, Some(Performance::from_hundredths(8725)));
    assert_eq!(stored.offline_trend, Some(-1));
    assert_eq!(stored.performance_trend, Some(-4));
    assert_eq!(stored.stats_date, Some(day(3)));
    assert!(stored.created_at.is_some());

    let fetched = repo.get_by_date(day(3)).await.unwrap().unwrap();
    assert_eq!(fetched, stored);
    assert!(repo.get_by_date(day(4)).await.unwrap().is_none());
}

#[tokio::test]
async fn snapshot_repo_upsert_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;

    let first = repo.upsert(&snapshot(day(1), 5, 5, 5000)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = repo.upsert(&snapshot(day(1), 7, 1, 6000)).await.unwrap();

    assert_eq!(second.online, Some(7));
    assert_eq!(second.total, Some(8));
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);

    let all = repo.select_range(day(0), day(10)).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn snapshot_repo_select_range_inclusive_ascending() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;
    for n in [9, 2, 5, 3, 12] {
        repo.upsert(&snapshot(day(n), n, 0, 5000)).await.unwrap();
    }

    let rows = repo.select_range(day(3), day(9)).await.unwrap();
    let dates: Vec<_> = rows.iter().filter_map(|r| r.stats_date).collect();
    assert_eq!(dates, vec![day(3), day(5), day(9)]);

    assert!(repo.select_range(day(20), day(30)).await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_repo_delete_older_than_is_exclusive() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;
    for n in [1, 2, 3, 4] {
        repo.upsert(&snapshot(day(n), 1, 0, 5000)).await.unwrap();
    }

    assert_eq!(repo.delete_older_than(day(3)).await.unwrap(), 2);
    let dates: Vec<_> = repo
        .select_range(day(0), day(10))
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.stats_date)
        .collect();
    assert_eq!(dates, vec![day(3), day(4)]);
    assert_eq!(repo.delete_older_than(day(3)).await.unwrap(), 0);
}

#[tokio::test]
async fn snapshot_repo_latest_picks_greatest_date() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;
    repo.upsert(&snapshot(day(10), 10, 0, 5000)).await.unwrap();
    repo.upsert(&snapshot(day(2), 2, 0, 5000)).await.unwrap();

    let latest = repo.latest().await.unwrap().unwrap();
    assert_eq!(latest.stats_date, Some(day(10)));
    assert_eq!(latest.online, Some(10));
}

#[tokio::test]
async fn snapshot_repo_null_columns_come_back_missing() {
    let dir = TempDir::new().unwrap();
    let pool = open(&dir).await;
    let repo = SqliteSnapshotRepo::new(pool.clone());
    repo.init().await.unwrap();

    sqlx::query(
        "INSERT INTO fleet_stats (stats_date, online_count, total_count, created_at, updated_at)
         VALUES ('2025-01-05', 4, 9, 0, 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let record = repo.get_by_date(day(4)).await.unwrap().unwrap();
    assert_eq!(record.online, Some(4));
    assert_eq!(record.offline, None);
    assert_eq!(record.avg_performance, None);
    assert!(!fleetstats::validator::validate(&record).is_valid());

    let repaired = fleetstats::validator::repair(record, day(4));
    assert_eq!(repaired.total, 4);
}

async fn registry(dir: &TempDir) -> SqliteDeviceRegistry {
    let registry = SqliteDeviceRegistry::new(open(dir).await);
    registry.init().await.unwrap();
    registry
}

#[tokio::test]
async fn registry_empty_fleet_reading() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir).await;

    let reading = registry.current_reading().await.unwrap();
    assert_eq!(reading.total, Some(0));
    assert_eq!(reading.online, None);
    assert_eq!(reading.avg_performance, None);
}

#[tokio::test]
async fn registry_aggregates_status_and_performance() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir).await;
    registry.upsert_device("d1", DeviceStatus::Online, Some(90.0)).await.unwrap();
    registry.upsert_device("d2", DeviceStatus::Online, Some(80.5)).await.unwrap();
    registry.upsert_device("d3", DeviceStatus::Error, Some(20.0)).await.unwrap();
    registry.upsert_device("d4", DeviceStatus::Maintenance, None).await.unwrap();

    let reading = registry.current_reading().await.unwrap();
    assert_eq!(reading.online, Some(2));
    assert_eq!(reading.offline, Some(0));
    assert_eq!(reading.error, Some(1));
    assert_eq!(reading.maintenance, Some(1));
    assert_eq!(reading.total, Some(4));
    // AVG skips NULL performance: (90 + 80.5 + 20) / 3
    assert_eq!(reading.avg_performance, Some(63.5));

    // Status change overwrites the row.
    registry.upsert_device("d3", DeviceStatus::Offline, Some(20.0)).await.unwrap();
    let reading = registry.current_reading().await.unwrap();
    assert_eq!(reading.error, Some(0));
    assert_eq!(reading.offline, Some(1));
    assert_eq!(reading.total, Some(4));
}

#[tokio::test]
async fn registry_and_store_share_one_database() {
    let dir = TempDir::new().unwrap();
    let pool = open(&dir).await;
    let registry = SqliteDeviceRegistry::new(pool.clone());
    registry.init().await.unwrap();
    let store = SqliteSnapshotRepo::new(pool);
    store.init().await.unwrap();

    registry.upsert_device("a", DeviceStatus::Online, Some(75.0)).await.unwrap();
    registry.upsert_device("b", DeviceStatus::Offline, Some(25.0)).await.unwrap();

    let store = Arc::new(store);
    let computer = StatsComputer::new(Arc::new(registry), store.clone(), Duration::from_secs(5));
    let persisted = computer.persist_current().await.unwrap();
    assert_eq!(persisted.total, 2);
    assert_eq!(persisted.avg_performance, Performance::from_whole(50));

    let stored = store.get_by_date(persisted.stats_date).await.unwrap().unwrap();
    assert_eq!(stored.online, Some(1));
    assert_eq!(stored.offline, Some(1));
}
