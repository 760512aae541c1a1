use serde::Deserialize;
use std::time::Duration;

use crate::series::EngineSettings;
use crate::series::gaps::{DEFAULT_GAP_FACTOR, MIN_EXPECTED_INTERVAL_SECS};

/// Retention bounds accepted for `database.retention_days`.
pub const MIN_RETENTION_DAYS: u32 = 1;
pub const MAX_RETENTION_DAYS: u32 = 90;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
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
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Floor applied to every host's poll interval when computing gap thresholds.
    pub min_poll_interval_secs: u32,
    /// Sample spacing above `gap_factor * expected_interval` is rendered as a break.
    pub gap_factor: u32,
    /// Boot-time drift tolerated between samples; unset means the host's expected interval.
    pub reboot_tolerance_secs: Option<u32>,
    /// 0 disables the navigation cache.
    pub navigation_cache_ttl_secs: u64,
    /// Width of one populated-index bucket. 0 disables the index.
    pub index_bucket_secs: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_poll_interval_secs: MIN_EXPECTED_INTERVAL_SECS,
            gap_factor: DEFAULT_GAP_FACTOR,
            reboot_tolerance_secs: None,
            navigation_cache_ttl_secs: 5,
            index_bucket_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Flush to the database once this many samples are buffered.
    pub flush_rate: u64,
    pub flush_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            flush_rate: 16,
            flush_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *"). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: 3600,
            vacuum_schedule: None,
            vacuum_interval_secs: 86_400,
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

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            min_poll_interval_secs: self.engine.min_poll_interval_secs,
            gap_factor: self.engine.gap_factor,
            reboot_tolerance_secs: self.engine.reboot_tolerance_secs,
            retention_days: self.database.retention_days,
            navigation_cache_ttl: Duration::from_secs(self.engine.navigation_cache_ttl_secs),
        }
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
            (MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&self.database.retention_days),
            "database.retention_days must be between {} and {}, got {}",
            MIN_RETENTION_DAYS,
            MAX_RETENTION_DAYS,
            self.database.retention_days
        );
        anyhow::ensure!(
            self.engine.min_poll_interval_secs >= MIN_EXPECTED_INTERVAL_SECS,
            "engine.min_poll_interval_secs must be >= {}, got {}",
            MIN_EXPECTED_INTERVAL_SECS,
            self.engine.min_poll_interval_secs
        );
        anyhow::ensure!(
            self.engine.gap_factor > 0,
            "engine.gap_factor must be > 0, got {}",
            self.engine.gap_factor
        );
        if let Some(tolerance) = self.engine.reboot_tolerance_secs {
            anyhow::ensure!(
                tolerance > 0,
                "engine.reboot_tolerance_secs must be > 0, got {}",
                tolerance
            );
        }
        anyhow::ensure!(
            self.ingest.flush_rate > 0,
            "ingest.flush_rate must be > 0, got {}",
            self.ingest.flush_rate
        );
        anyhow::ensure!(
            self.ingest.flush_interval_secs > 0,
            "ingest.flush_interval_secs must be > 0, got {}",
            self.ingest.flush_interval_secs
        );
        anyhow::ensure!(
            self.maintenance.prune_interval_secs > 0,
            "maintenance.prune_interval_secs must be > 0, got {}",
            self.maintenance.prune_interval_secs
        );
        anyhow::ensure!(
            self.maintenance.vacuum_interval_secs > 0,
            "maintenance.vacuum_interval_secs must be > 0, got {}",
            self.maintenance.vacuum_interval_secs
        );
        Ok(())
    }
}
