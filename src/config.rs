use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a computed dashboard snapshot is served before recomputation.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Compute once at startup so the first request does not pay the cold cost.
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
    /// How often the scheduler evicts a stale cache entry.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_warm_up() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            warm_up: default_warm_up(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Upper bound on one registry query; exceeding it degrades to the zero snapshot.
    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_registry_timeout_ms() -> u64 {
    5000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_registry_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub days: u32,
}

fn default_retention_days() -> u32 {
    30
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression (with seconds field, local time) for persisting today's snapshot.
    #[serde(default = "default_persist_cron")]
    pub persist_cron: String,
    /// Cron expression for the retention purge.
    #[serde(default = "default_purge_cron")]
    pub purge_cron: String,
}

fn default_persist_cron() -> String {
    "0 0 * * * *".into()
}

fn default_purge_cron() -> String {
    "0 0 2 * * *".into()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            persist_cron: default_persist_cron(),
            purge_cron: default_purge_cron(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.cache.ttl_secs > 0,
            "cache.ttl_secs must be > 0, got {}",
            self.cache.ttl_secs
        );
        anyhow::ensure!(
            self.cache.sweep_interval_secs > 0,
            "cache.sweep_interval_secs must be > 0, got {}",
            self.cache.sweep_interval_secs
        );
        anyhow::ensure!(
            self.registry.timeout_ms > 0,
            "registry.timeout_ms must be > 0, got {}",
            self.registry.timeout_ms
        );
        anyhow::ensure!(
            self.retention.days > 0,
            "retention.days must be > 0, got {}",
            self.retention.days
        );
        for (name, expr) in [
            ("schedule.persist_cron", &self.schedule.persist_cron),
            ("schedule.purge_cron", &self.schedule.purge_cron),
        ] {
            if let Err(e) = cron::Schedule::from_str(expr) {
                anyhow::bail!("{} is not a valid cron expression ({:?}): {}", name, expr, e);
            }
        }
        Ok(())
    }
}
