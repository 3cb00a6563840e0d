// Loosely-typed snapshot as it arrives from outside: store rows with NULL columns,
// registry aggregates over an empty fleet, JSON request bodies.
// Every numeric field is optional and signed so the validator can see what is wrong.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{FleetSnapshot, Performance};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotRecord {
    pub online: Option<i64>,
    pub offline: Option<i64>,
    pub error: Option<i64>,
    pub maintenance: Option<i64>,
    pub total: Option<i64>,
    pub avg_performance: Option<Performance>,
    pub online_trend: Option<i64>,
    pub offline_trend: Option<i64>,
    pub error_trend: Option<i64>,
    pub performance_trend: Option<i64>,
    pub stats_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&FleetSnapshot> for SnapshotRecord {
    fn from(s: &FleetSnapshot) -> Self {
        let count = |v: u64| Some(i64::try_from(v).unwrap_or(i64::MAX));
        Self {
            online: count(s.status_counts.online),
            offline: count(s.status_counts.offline),
            error: count(s.status_counts.error),
            maintenance: count(s.status_counts.maintenance),
            total: count(s.total),
            avg_performance: Some(s.avg_performance),
            online_trend: Some(s.trends.online),
            offline_trend: Some(s.trends.offline),
            error_trend: Some(s.trends.error),
            performance_trend: Some(s.trends.performance),
            stats_date: Some(s.stats_date),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
