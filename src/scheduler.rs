// Background jobs: persist today's fleet snapshot and purge expired ones on cron schedules
// (local time), and evict a stale dashboard cache entry on a fixed interval.
// A failed run is logged and left for the next trigger; there is no retry loop here.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::error::StatsError;
use crate::models::FleetSnapshot;
use crate::stats_cache::StatsCache;
use crate::stats_computer::StatsComputer;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cron expression for persist (e.g. "0 0 * * * *" = hourly).
    pub persist_schedule: String,
    /// Cron expression for purge (e.g. "0 0 2 * * *" = 02:00 daily).
    pub purge_schedule: String,
    pub retention_days: u32,
    pub cache_sweep_interval_secs: u64,
}

/// Spawns the scheduler task. It stops when `shutdown_rx` fires (or its sender is dropped).
pub fn spawn(
    computer: Arc<StatsComputer>,
    cache: Arc<StatsCache>,
    config: SchedulerConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(computer, cache, config, shutdown_rx).await;
    })
}

#[instrument(skip_all, fields(retention_days = config.retention_days))]
async fn run(
    computer: Arc<StatsComputer>,
    cache: Arc<StatsCache>,
    config: SchedulerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut sweep_interval =
        tokio::time::interval(Duration::from_secs(config.cache_sweep_interval_secs));
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (persist_tx, mut persist_rx) = mpsc::channel::<()>(1);
    let (purge_tx, mut purge_rx) = mpsc::channel::<()>(1);
    let persist_trigger = tokio::spawn(cron_trigger(
        "persist",
        config.persist_schedule.clone(),
        persist_tx,
    ));
    let purge_trigger = tokio::spawn(cron_trigger(
        "purge",
        config.purge_schedule.clone(),
        purge_tx,
    ));

    loop {
        tokio::select! {
            Some(()) = persist_rx.recv() => {
                run_persist(&computer).await.ok();
            }
            Some(()) = purge_rx.recv() => {
                run_purge(&computer, config.retention_days).await.ok();
            }
            _ = sweep_interval.tick() => {
                cache.clear_expired().await;
            }
            _ = &mut shutdown_rx => {
                debug!("scheduler shutting down");
                break;
            }
        }
    }

    persist_trigger.abort();
    purge_trigger.abort();
}

/// Sends on `tx` at each time matched by `expr` (local time). Returns if `expr` does not parse.
async fn cron_trigger(job: &'static str, expr: String, tx: mpsc::Sender<()>) {
    let schedule = match cron::Schedule::from_str(&expr) {
        Ok(s) => s,
        Err(e) => {
            warn!(job, cron = %expr, error = %e, "invalid schedule; job will not run");
            return;
        }
    };
    loop {
        let now = chrono::Local::now();
        if let Some(next) = schedule.after(&now).next() {
            let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(delay).await;
            if tx.send(()).await.is_err() {
                break;
            }
        } else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

/// One persist run with outcome logging. Used by the scheduler loop and the HTTP save route.
pub async fn run_persist(computer: &StatsComputer) -> Result<FleetSnapshot, StatsError> {
    match computer.persist_current().await {
        Ok(snapshot) => {
            info!(
                job = "persist",
                stats_date = %snapshot.stats_date,
                total = snapshot.total,
                "scheduled run complete"
            );
            Ok(snapshot)
        }
        Err(e) => {
            warn!(job = "persist", error = %e, "scheduled run failed");
            Err(e)
        }
    }
}

/// One purge run with outcome logging.
pub async fn run_purge(computer: &StatsComputer, retention_days: u32) -> Result<u64, StatsError> {
    match computer.purge_older_than(retention_days).await {
        Ok(purged) => {
            info!(job = "purge", purged, retention_days, "scheduled run complete");
            Ok(purged)
        }
        Err(e) => {
            warn!(job = "purge", error = %e, "scheduled run failed");
            Err(e)
        }
    }
}
