// Read-through cache for the dashboard snapshot: one slot, fixed TTL, single-flight refresh.
//
// Fresh reads share the read lock. A stale read takes the write lock and re-checks the slot
// before computing, so concurrent stale readers queue behind one recomputation and then reuse
// its result instead of querying the registry again.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::FleetSnapshot;
use crate::stats_computer::{StatsComputer, yesterday};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedSnapshot {
    snapshot: Arc<FleetSnapshot>,
    expires_at: Instant,
}

impl CachedSnapshot {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub recomputations: u64,
    pub ttl_secs: u64,
}

pub struct StatsCache {
    computer: Arc<StatsComputer>,
    ttl: Duration,
    slot: RwLock<Option<CachedSnapshot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    recomputations: AtomicU64,
}

impl StatsCache {
    pub fn new(computer: Arc<StatsComputer>, ttl: Duration) -> Self {
        Self {
            computer,
            ttl,
            slot: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            recomputations: AtomicU64::new(0),
        }
    }

    /// Cached snapshot if fresh, else recompute (at most once per expiry window).
    pub async fn get(&self) -> Arc<FleetSnapshot> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref()
                && cached.is_fresh(Instant::now())
            {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return cached.snapshot.clone();
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.slot.write().await;
        if let Some(cached) = slot.as_ref()
            && cached.is_fresh(Instant::now())
        {
            debug!("fleet snapshot refreshed by a concurrent reader");
            return cached.snapshot.clone();
        }

        let snapshot = Arc::new(self.computer.compute_with_trend(yesterday()).await);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        *slot = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        debug!(
            ttl_secs = self.ttl.as_secs(),
            total = snapshot.total,
            "fleet snapshot cached"
        );
        snapshot
    }

    /// Empty the slot; the next `get` recomputes.
    pub async fn clear(&self) {
        self.slot.write().await.take();
        debug!("fleet snapshot cache cleared");
    }

    /// Empty the slot only if it is stale. Returns whether an entry was removed.
    pub async fn clear_expired(&self) -> bool {
        let mut slot = self.slot.write().await;
        let stale = slot
            .as_ref()
            .is_some_and(|cached| !cached.is_fresh(Instant::now()));
        if stale {
            slot.take();
            debug!("expired fleet snapshot evicted");
        }
        stale
    }

    /// Populate the slot once at startup so the first dashboard request is served from cache.
    pub async fn warm_up(&self) {
        let snapshot = self.get().await;
        info!(
            total = snapshot.total,
            online = snapshot.status_counts.online,
            "fleet snapshot cache warmed up"
        );
    }

    /// 1 if the slot holds an entry (fresh or stale), else 0.
    pub async fn size(&self) -> usize {
        usize::from(self.slot.read().await.is_some())
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.size().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}
