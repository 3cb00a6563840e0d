// Daily fleet snapshot persistence. One row per stats_date (unique); dates are stored as
// ISO-8601 text so range and cutoff comparisons are plain string comparisons.
// Count and performance columns are nullable: a damaged row comes back as a SnapshotRecord
// with missing fields and goes through the validator like any other external input.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

use crate::db::now_ms;
use crate::models::{FleetSnapshot, Performance, SnapshotRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

const COLUMNS: &str = "stats_date, online_count, offline_count, error_count, maintenance_count, \
     total_count, avg_performance, online_trend, offline_trend, error_trend, performance_trend, \
     created_at, updated_at";

/// Persistence for dated snapshots. Implementations must keep at most one row per date.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<SnapshotRecord>>;

    /// Insert the row for `snapshot.stats_date`, or update it in place if one exists.
    /// Returns the stored row including store-assigned timestamps.
    async fn upsert(&self, snapshot: &FleetSnapshot) -> anyhow::Result<SnapshotRecord>;

    /// Rows with `start <= stats_date <= end`, ascending by date.
    async fn select_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<SnapshotRecord>>;

    /// Delete rows with `stats_date < cutoff`; returns the number removed.
    async fn delete_older_than(&self, cutoff: NaiveDate) -> anyhow::Result<u64>;

    /// Row with the greatest stats_date.
    async fn latest(&self) -> anyhow::Result<Option<SnapshotRecord>>;
}

pub struct SqliteSnapshotRepo {
    pool: SqlitePool,
}

impl SqliteSnapshotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fleet_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stats_date TEXT NOT NULL UNIQUE,
                online_count INTEGER,
                offline_count INTEGER,
                error_count INTEGER,
                maintenance_count INTEGER,
                total_count INTEGER,
                avg_performance REAL,
                online_trend INTEGER,
                offline_trend INTEGER,
                error_trend INTEGER,
                performance_trend INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn parse_row(row: &SqliteRow) -> anyhow::Result<SnapshotRecord> {
        let stats_date: String = row.try_get("stats_date")?;
        let stats_date = NaiveDate::parse_from_str(&stats_date, DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("stats_date {:?}: {}", stats_date, e))?;
        let avg_performance: Option<f64> = row.try_get("avg_performance")?;
        let created_at: i64 = row.try_get("created_at")?;
        let updated_at: i64 = row.try_get("updated_at")?;

        Ok(SnapshotRecord {
            online: row.try_get("online_count")?,
            offline: row.try_get("offline_count")?,
            error: row.try_get("error_count")?,
            maintenance: row.try_get("maintenance_count")?,
            total: row.try_get("total_count")?,
            avg_performance: avg_performance.and_then(Performance::from_f64),
            online_trend: row.try_get("online_trend")?,
            offline_trend: row.try_get("offline_trend")?,
            error_trend: row.try_get("error_trend")?,
            performance_trend: row.try_get("performance_trend")?,
            stats_date: Some(stats_date),
            created_at: DateTime::<Utc>::from_timestamp_millis(created_at),
            updated_at: DateTime::<Utc>::from_timestamp_millis(updated_at),
        })
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn count(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotRepo {
    #[instrument(skip(self), fields(repo = "snapshots", operation = "get_by_date"))]
    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<SnapshotRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM fleet_stats WHERE stats_date = $1"
        ))
        .bind(date_key(date))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    #[instrument(
        skip(self, snapshot),
        fields(repo = "snapshots", operation = "upsert", stats_date = %snapshot.stats_date)
    )]
    async fn upsert(&self, snapshot: &FleetSnapshot) -> anyhow::Result<SnapshotRecord> {
        let now = now_ms()?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO fleet_stats ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT(stats_date) DO UPDATE SET
                online_count = excluded.online_count,
                offline_count = excluded.offline_count,
                error_count = excluded.error_count,
                maintenance_count = excluded.maintenance_count,
                total_count = excluded.total_count,
                avg_performance = excluded.avg_performance,
                online_trend = excluded.online_trend,
                offline_trend = excluded.offline_trend,
                error_trend = excluded.error_trend,
                performance_trend = excluded.performance_trend,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(date_key(snapshot.stats_date))
        .bind(count(snapshot.status_counts.online))
        .bind(count(snapshot.status_counts.offline))
        .bind(count(snapshot.status_counts.error))
        .bind(count(snapshot.status_counts.maintenance))
        .bind(count(snapshot.total))
        .bind(snapshot.avg_performance.as_f64())
        .bind(snapshot.trends.online)
        .bind(snapshot.trends.offline)
        .bind(snapshot.trends.error)
        .bind(snapshot.trends.performance)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Self::parse_row(&row)
    }

    #[instrument(skip(self), fields(repo = "snapshots", operation = "select_range"))]
    async fn select_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<SnapshotRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM fleet_stats
             WHERE stats_date >= $1 AND stats_date <= $2 ORDER BY stats_date ASC"
        ))
        .bind(date_key(start))
        .bind(date_key(end))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "snapshots", operation = "delete_older_than"))]
    async fn delete_older_than(&self, cutoff: NaiveDate) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM fleet_stats WHERE stats_date < $1")
            .bind(date_key(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    #[instrument(skip(self), fields(repo = "snapshots", operation = "latest"))]
    async fn latest(&self) -> anyhow::Result<Option<SnapshotRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM fleet_stats ORDER BY stats_date DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }
}
