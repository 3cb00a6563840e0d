// Shared test helpers: in-memory registry and store fakes, snapshot builders

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use fleetstats::models::*;
use fleetstats::registry::{DeviceRegistry, RegistryReading};
use fleetstats::snapshot_repo::SnapshotStore;
use fleetstats::stats_computer::{StatsComputer, today};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Registry fake: fixed reading, optional delay, switchable failure, call counter.
pub struct FakeRegistry {
    reading: Mutex<RegistryReading>,
    delay: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new(reading: RegistryReading) -> Self {
        Self::with_delay(reading, Duration::ZERO)
    }

    pub fn with_delay(reading: RegistryReading, delay: Duration) -> Self {
        Self {
            reading: Mutex::new(reading),
            delay,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_reading(&self, reading: RegistryReading) {
        *self.reading.lock().unwrap() = reading;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceRegistry for FakeRegistry {
    async fn current_reading(&self) -> anyhow::Result<RegistryReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("registry unreachable");
        }
        Ok(self.reading.lock().unwrap().clone())
    }
}

/// Store fake keyed by date, with switchable failure.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<NaiveDate, SnapshotRecord>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<SnapshotRecord>> {
        self.check()?;
        Ok(self.rows.lock().unwrap().get(&date).cloned())
    }

    async fn upsert(&self, snapshot: &FleetSnapshot) -> anyhow::Result<SnapshotRecord> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let created_at = rows
            .get(&snapshot.stats_date)
            .and_then(|r| r.created_at)
            .unwrap_or(now);
        let mut record = SnapshotRecord::from(snapshot);
        record.created_at = Some(created_at);
        record.updated_at = Some(now);
        rows.insert(snapshot.stats_date, record.clone());
        Ok(record)
    }

    async fn select_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<SnapshotRecord>> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .range(start..=end)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> anyhow::Result<u64> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|date, _| *date >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn latest(&self) -> anyhow::Result<Option<SnapshotRecord>> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .last_key_value()
            .map(|(_, r)| r.clone()))
    }
}

pub fn reading(online: i64, offline: i64, error: i64, maintenance: i64, perf: f64) -> RegistryReading {
    RegistryReading {
        online: Some(online),
        offline: Some(offline),
        error: Some(error),
        maintenance: Some(maintenance),
        total: Some(online + offline + error + maintenance),
        avg_performance: Some(perf),
    }
}

pub fn snapshot(
    date: NaiveDate,
    online: u64,
    offline: u64,
    error: u64,
    maintenance: u64,
    perf_hundredths: i64,
) -> FleetSnapshot {
    let status_counts = StatusCounts {
        online,
        offline,
        error,
        maintenance,
    };
    FleetSnapshot {
        status_counts,
        total: status_counts.sum(),
        avg_performance: Performance::from_hundredths(perf_hundredths),
        trends: Trends::default(),
        stats_date: date,
        created_at: None,
        updated_at: None,
    }
}

pub fn days_ago(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).unwrap()
}

pub fn computer(registry: Arc<FakeRegistry>, store: Arc<MemoryStore>) -> StatsComputer {
    StatsComputer::new(registry, store, Duration::from_secs(5))
}
