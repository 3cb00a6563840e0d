// Snapshot computation: live registry reading -> repaired snapshot, trends against a stored
// reference day, daily persistence and retention purge.
//
// Read paths (compute_current, compute_with_trend, get_history, get_latest) never fail: they
// log and degrade to the zero snapshot or an empty history. Scheduled paths (persist_current,
// purge_older_than) return StatsError so a failed run is visible to the scheduler.

use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StatsError;
use crate::models::FleetSnapshot;
use crate::registry::DeviceRegistry;
use crate::snapshot_repo::SnapshotStore;
use crate::validator;

/// Local calendar date; snapshots are keyed by it.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Reference day for dashboard trends.
pub fn yesterday() -> NaiveDate {
    days_before(today(), 1)
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

pub struct StatsComputer {
    registry: Arc<dyn DeviceRegistry>,
    store: Arc<dyn SnapshotStore>,
    registry_timeout: Duration,
}

impl StatsComputer {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        store: Arc<dyn SnapshotStore>,
        registry_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            registry_timeout,
        }
    }

    /// One bounded registry query, normalized into a snapshot dated `date` (trends zero).
    async fn read_registry(&self, date: NaiveDate) -> Result<FleetSnapshot, StatsError> {
        let reading =
            match tokio::time::timeout(self.registry_timeout, self.registry.current_reading())
                .await
            {
                Ok(Ok(reading)) => reading,
                Ok(Err(e)) => return Err(StatsError::Registry(e)),
                Err(_) => return Err(StatsError::RegistryTimeout(self.registry_timeout)),
            };

        let record = reading.into_record(date);
        let report = validator::validate(&record);
        if !report.is_valid() {
            // An empty fleet yields NULL aggregates; repair turns those into zeros.
            debug!(errors = ?report.errors, "registry reading needed repair");
        }
        Ok(validator::repair(record, date))
    }

    async fn load_reference(
        &self,
        reference_date: NaiveDate,
    ) -> Result<Option<FleetSnapshot>, StatsError> {
        let record = self
            .store
            .get_by_date(reference_date)
            .await
            .map_err(StatsError::store("get_by_date"))?;
        Ok(record.map(|r| validator::repair(r, reference_date)))
    }

    async fn try_compute_with_trend(
        &self,
        date: NaiveDate,
        reference_date: NaiveDate,
    ) -> Result<FleetSnapshot, StatsError> {
        let mut current = self.read_registry(date).await?;
        let reference = self.load_reference(reference_date).await?;
        current.trends = current.trends_against(reference.as_ref());
        Ok(current)
    }

    /// Current fleet state with zero trends. Registry failure or timeout yields the zero snapshot.
    #[instrument(skip(self), fields(operation = "compute_current"))]
    pub async fn compute_current(&self) -> FleetSnapshot {
        let date = today();
        match self.read_registry(date).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "registry unavailable, serving zero snapshot");
                FleetSnapshot::zero(date)
            }
        }
    }

    /// Current fleet state with trends against the stored snapshot for `reference_date`.
    /// No stored reference (or a failed lookup) means all trends are zero.
    #[instrument(skip(self), fields(operation = "compute_with_trend"))]
    pub async fn compute_with_trend(&self, reference_date: NaiveDate) -> FleetSnapshot {
        let date = today();
        let mut current = match self.read_registry(date).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "registry unavailable, serving zero snapshot");
                return FleetSnapshot::zero(date);
            }
        };

        let reference = match self.load_reference(reference_date).await {
            Ok(reference) => reference,
            Err(e) => {
                warn!(error = %e, %reference_date, "reference snapshot unavailable, trends zeroed");
                None
            }
        };
        current.trends = current.trends_against(reference.as_ref());
        current
    }

    /// Compute today's snapshot with trends against yesterday, repair it and upsert it.
    /// Registry or store failures are returned, never replaced by a zero snapshot.
    #[instrument(skip(self), fields(operation = "persist_current"))]
    pub async fn persist_current(&self) -> Result<FleetSnapshot, StatsError> {
        let date = today();
        let computed = self
            .try_compute_with_trend(date, days_before(date, 1))
            .await?;
        let snapshot = validator::repair_snapshot(computed);

        let report = validator::validate_snapshot(&snapshot);
        if !report.is_valid() {
            return Err(StatsError::InvalidSnapshot {
                date,
                errors: report.errors.join("; "),
            });
        }
        for warning in &report.warnings {
            warn!(stats_date = %date, warning = %warning, "implausible fleet snapshot");
        }

        let stored = self
            .store
            .upsert(&snapshot)
            .await
            .map_err(StatsError::store("upsert"))?;

        info!(
            stats_date = %date,
            online = snapshot.status_counts.online,
            offline = snapshot.status_counts.offline,
            error = snapshot.status_counts.error,
            total = snapshot.total,
            avg_performance = %snapshot.avg_performance,
            "fleet snapshot persisted"
        );
        Ok(validator::repair(stored, date))
    }

    /// Stored snapshots in `[start, end]`, ascending. Store errors yield an empty history.
    #[instrument(skip(self), fields(operation = "get_history"))]
    pub async fn get_history(&self, start: NaiveDate, end: NaiveDate) -> Vec<FleetSnapshot> {
        if start > end {
            return Vec::new();
        }
        match self.store.select_range(start, end).await {
            Ok(records) => records
                .into_iter()
                .map(|r| validator::repair(r, start))
                .collect(),
            Err(e) => {
                error!(error = %e, %start, %end, "snapshot history unavailable");
                Vec::new()
            }
        }
    }

    /// Mean of the stored snapshots in `[start, end]`, dated `end`. Zero snapshot when none.
    #[instrument(skip(self), fields(operation = "get_history_average"))]
    pub async fn get_history_average(&self, start: NaiveDate, end: NaiveDate) -> FleetSnapshot {
        let history = self.get_history(start, end).await;
        debug!(days = history.len(), "averaging snapshot history");
        FleetSnapshot::average(&history, end)
    }

    /// Delete stored snapshots dated more than `retention_days` before today.
    #[instrument(skip(self), fields(operation = "purge_older_than"))]
    pub async fn purge_older_than(&self, retention_days: u32) -> Result<u64, StatsError> {
        let cutoff = days_before(today(), retention_days as u64);
        let purged = self
            .store
            .delete_older_than(cutoff)
            .await
            .map_err(StatsError::store("delete_older_than"))?;
        info!(%cutoff, purged, "expired fleet snapshots purged");
        Ok(purged)
    }

    /// Most recent stored snapshot; a live computation when nothing is stored yet.
    #[instrument(skip(self), fields(operation = "get_latest"))]
    pub async fn get_latest(&self) -> FleetSnapshot {
        match self.store.latest().await {
            Ok(Some(record)) => validator::repair(record, today()),
            Ok(None) => {
                debug!("no stored snapshot, computing live");
                self.compute_with_trend(yesterday()).await
            }
            Err(e) => {
                error!(error = %e, "latest snapshot unavailable, serving zero snapshot");
                FleetSnapshot::zero(today())
            }
        }
    }
}
