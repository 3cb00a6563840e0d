// Registry reading over the `devices` table: one aggregate query per reading.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use super::{DeviceRegistry, RegistryReading};
use crate::db::now_ms;
use crate::models::DeviceStatus;

pub struct SqliteDeviceRegistry {
    pool: SqlitePool,
}

impl SqliteDeviceRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                device_id TEXT PRIMARY KEY,
                status TEXT NOT NULL CHECK (status IN ('online', 'offline', 'error', 'maintenance')),
                performance REAL,
                deleted INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_status ON devices(status, deleted)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert or overwrite one device's status (seeding and tests; the registry owner does this in production).
    #[instrument(skip(self), fields(repo = "devices", operation = "upsert_device"))]
    pub async fn upsert_device(
        &self,
        device_id: &str,
        status: DeviceStatus,
        performance: Option<f64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO devices (device_id, status, performance, deleted, updated_at)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT(device_id) DO UPDATE SET
                status = excluded.status,
                performance = excluded.performance,
                deleted = 0,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(device_id)
        .bind(status.as_str())
        .bind(performance)
        .bind(now_ms()?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for SqliteDeviceRegistry {
    #[instrument(skip(self), fields(repo = "devices", operation = "current_reading"))]
    async fn current_reading(&self) -> anyhow::Result<RegistryReading> {
        let row = sqlx::query(
            r#"
            SELECT
                SUM(CASE WHEN status = 'online' THEN 1 ELSE 0 END) AS online,
                SUM(CASE WHEN status = 'offline' THEN 1 ELSE 0 END) AS offline,
                SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END) AS error,
                SUM(CASE WHEN status = 'maintenance' THEN 1 ELSE 0 END) AS maintenance,
                COUNT(*) AS total,
                ROUND(AVG(performance), 2) AS avg_performance
            FROM devices
            WHERE deleted = 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RegistryReading {
            online: row.try_get("online")?,
            offline: row.try_get("offline")?,
            error: row.try_get("error")?,
            maintenance: row.try_get("maintenance")?,
            total: row.try_get("total")?,
            avg_performance: row.try_get("avg_performance")?,
        })
    }
}
