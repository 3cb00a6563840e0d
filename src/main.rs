use anyhow::Result;
use fleetstats::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let pool = db::connect(&app_config.database.path, app_config.database.max_pool_size).await?;
    let snapshots = snapshot_repo::SqliteSnapshotRepo::new(pool.clone());
    snapshots.init().await?;
    let device_registry = registry::SqliteDeviceRegistry::new(pool);
    device_registry.init().await?;

    let computer = Arc::new(stats_computer::StatsComputer::new(
        Arc::new(device_registry),
        Arc::new(snapshots),
        Duration::from_millis(app_config.registry.timeout_ms),
    ));
    let cache = Arc::new(stats_cache::StatsCache::new(
        computer.clone(),
        Duration::from_secs(app_config.cache.ttl_secs),
    ));
    if app_config.cache.warm_up {
        cache.warm_up().await;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_handle = scheduler::spawn(
        computer.clone(),
        cache.clone(),
        scheduler::SchedulerConfig {
            persist_schedule: app_config.schedule.persist_cron.clone(),
            purge_schedule: app_config.schedule.purge_cron.clone(),
            retention_days: app_config.retention.days,
            cache_sweep_interval_secs: app_config.cache.sweep_interval_secs,
        },
        shutdown_rx,
    );

    let app = routes::app(cache, computer);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = scheduler_handle.await;
        }
    }

    Ok(())
}
