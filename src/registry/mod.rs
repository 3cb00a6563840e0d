// Device registry: the live source of truth for device status.
// The stats core only reads one aggregate from it; status transitions are owned elsewhere.

mod sqlite;

pub use sqlite::SqliteDeviceRegistry;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Performance, SnapshotRecord};

/// Per-status device counts and mean performance at the time of the query.
/// Aggregates over an empty fleet may come back as `None` (SQL `SUM`/`AVG` of no rows).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryReading {
    pub online: Option<i64>,
    pub offline: Option<i64>,
    pub error: Option<i64>,
    pub maintenance: Option<i64>,
    pub total: Option<i64>,
    pub avg_performance: Option<f64>,
}

impl RegistryReading {
    pub fn into_record(self, stats_date: NaiveDate) -> SnapshotRecord {
        SnapshotRecord {
            online: self.online,
            offline: self.offline,
            error: self.error,
            maintenance: self.maintenance,
            total: self.total,
            avg_performance: self.avg_performance.and_then(Performance::from_f64),
            stats_date: Some(stats_date),
            ..SnapshotRecord::default()
        }
    }
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Current counts per status plus aggregate performance. Callers bound this with a timeout.
    async fn current_reading(&self) -> anyhow::Result<RegistryReading>;
}
