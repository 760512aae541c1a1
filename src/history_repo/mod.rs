// SQLite snapshot store: host configuration records and per-host metric samples.
// Scalars live in columns; keyed sub-series (mounts, interfaces, disks) are wincode BLOBs
// with a version prefix. Timestamps are stored as epoch milliseconds.

mod blob;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::error::EngineError;
use crate::models::{
    CpuLoad, DiskTemperature, Host, HostId, MountedVolume, NetworkCounter, NewHost, Sample,
    SelectedMetrics,
};
use crate::series::SnapshotSource;

/// Result of one retention pass.
#[derive(Debug, Clone, Copy)]
pub struct PruneReport {
    pub deleted: u64,
    pub cutoff: DateTime<Utc>,
}

pub struct HistoryRepo {
    pool: SqlitePool,
    retention_days: u32,
}

impl HistoryRepo {
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            retention_days,
        })
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hosts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                poll_interval_seconds INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                selected_metrics TEXT NOT NULL,
                last_seen_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metric_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host_id INTEGER NOT NULL,
                reported_at INTEGER NOT NULL,
                cpu_temperature_c REAL,
                ram_used_percent REAL,
                total_ram_gb REAL,
                disk_usage_percent REAL,
                load_1 REAL,
                load_5 REAL,
                load_15 REAL,
                uptime_seconds INTEGER,
                mounted_data BLOB NOT NULL,
                network_data BLOB NOT NULL,
                disk_temp_data BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_host_reported_at ON metric_snapshots(host_id, reported_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, new_host), fields(repo = "history", operation = "register_host", name = %new_host.name))]
    pub async fn register_host(&self, new_host: &NewHost) -> anyhow::Result<Host> {
        let selected = serde_json::to_string(&new_host.selected_metrics)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO hosts (name, poll_interval_seconds, is_active, selected_metrics) VALUES ($1, $2, 1, $3) RETURNING id",
        )
        .bind(&new_host.name)
        .bind(i64::from(new_host.poll_interval_seconds))
        .bind(&selected)
        .fetch_one(&self.pool)
        .await?;
        Ok(Host {
            id,
            name: new_host.name.clone(),
            poll_interval_seconds: new_host.poll_interval_seconds,
            is_active: true,
            selected_metrics: new_host.selected_metrics.clone(),
            last_seen_at: None,
        })
    }

    pub async fn get_host(&self, host_id: HostId) -> Result<Option<Host>, EngineError> {
        let row = sqlx::query(
            "SELECT id, name, poll_interval_seconds, is_active, selected_metrics, last_seen_at FROM hosts WHERE id = $1",
        )
        .bind(host_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_host_row).transpose()
    }

    pub async fn list_hosts(&self) -> anyhow::Result<Vec<Host>> {
        let rows = sqlx::query(
            "SELECT id, name, poll_interval_seconds, is_active, selected_metrics, last_seen_at FROM hosts ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(parse_host_row(row)?);
        }
        Ok(out)
    }

    /// Records the newest sample instant seen for a host.
    pub async fn touch_host(&self, host_id: HostId, seen_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE hosts SET last_seen_at = MAX(COALESCE(last_seen_at, 0), $1) WHERE id = $2",
        )
        .bind(seen_at.timestamp_millis())
        .bind(host_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, samples), fields(repo = "history", operation = "save_samples", samples_count = samples.len()))]
    pub async fn save_samples(&self, samples: &[Sample]) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in samples {
            let mounted_data = blob::with_version_prefix(
                blob::BLOB_VERSION,
                wincode::serialize(&s.mounted_usage).map_err(|e| anyhow::anyhow!("wincode: {}", e))?,
            );
            let network_data = blob::with_version_prefix(
                blob::BLOB_VERSION,
                wincode::serialize(&s.network_counters)
                    .map_err(|e| anyhow::anyhow!("wincode: {}", e))?,
            );
            let disk_temp_data = blob::with_version_prefix(
                blob::BLOB_VERSION,
                wincode::serialize(&s.disk_temperatures)
                    .map_err(|e| anyhow::anyhow!("wincode: {}", e))?,
            );
            let load = s.cpu_load.unwrap_or_default();
            sqlx::query(
                r#"
                INSERT INTO metric_snapshots
                (host_id, reported_at, cpu_temperature_c, ram_used_percent, total_ram_gb,
                 disk_usage_percent, load_1, load_5, load_15, uptime_seconds,
                 mounted_data, network_data, disk_temp_data)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(s.host_id)
            .bind(s.reported_at.timestamp_millis())
            .bind(s.cpu_temperature_c)
            .bind(s.ram_used_percent)
            .bind(s.total_ram_gb)
            .bind(s.disk_usage_percent)
            .bind(load.one)
            .bind(load.five)
            .bind(load.fifteen)
            .bind(s.uptime_seconds)
            .bind(&mounted_data)
            .bind(&network_data)
            .bind(&disk_temp_data)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Samples of `host_id` in [start, end), ascending by reported_at. One query.
    #[instrument(skip(self), fields(repo = "history", operation = "get_samples_between"))]
    pub async fn get_samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, EngineError> {
        let rows = sqlx::query(
            "SELECT host_id, reported_at, cpu_temperature_c, ram_used_percent, total_ram_gb,
                    disk_usage_percent, load_1, load_5, load_15, uptime_seconds,
                    mounted_data, network_data, disk_temp_data
             FROM metric_snapshots
             WHERE host_id = $1 AND reported_at >= $2 AND reported_at < $3
             ORDER BY reported_at ASC, id ASC",
        )
        .bind(host_id)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(parse_sample_row(row)?);
        }
        Ok(out)
    }

    pub async fn has_samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM metric_snapshots WHERE host_id = $1 AND reported_at >= $2 AND reported_at < $3)",
        )
        .bind(host_id)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    /// Newest stored sample of a host, if any.
    pub async fn get_latest_sample(&self, host_id: HostId) -> Result<Option<Sample>, EngineError> {
        Ok(self.get_recent_samples(host_id, 1).await?.pop())
    }

    /// Most recent `limit` samples of a host, ascending.
    pub async fn get_recent_samples(
        &self,
        host_id: HostId,
        limit: u32,
    ) -> Result<Vec<Sample>, EngineError> {
        let rows = sqlx::query(
            "SELECT host_id, reported_at, cpu_temperature_c, ram_used_percent, total_ram_gb,
                    disk_usage_percent, load_1, load_5, load_15, uptime_seconds,
                    mounted_data, network_data, disk_temp_data
             FROM metric_snapshots WHERE host_id = $1 ORDER BY reported_at DESC, id DESC LIMIT $2",
        )
        .bind(host_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(parse_sample_row(row)?);
        }
        out.reverse();
        Ok(out)
    }

    /// Distinct (host, bucket) pairs holding data, bucket = reported_at / bucket width.
    #[instrument(skip(self), fields(repo = "history", operation = "populated_buckets"))]
    pub async fn populated_buckets(&self, bucket_secs: u32) -> anyhow::Result<Vec<(HostId, i64)>> {
        let bucket_ms = i64::from(bucket_secs.max(1)) * 1000;
        let rows = sqlx::query(
            "SELECT DISTINCT host_id, reported_at / $1 AS bucket FROM metric_snapshots",
        )
        .bind(bucket_ms)
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push((row.try_get("host_id")?, row.try_get("bucket")?));
        }
        Ok(out)
    }

    /// Deletes samples older than the retention window.
    #[instrument(skip(self), fields(repo = "history", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<PruneReport> {
        let cutoff = Utc::now() - TimeDelta::days(i64::from(self.retention_days));
        let r = sqlx::query("DELETE FROM metric_snapshots WHERE reported_at < $1")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(PruneReport {
            deleted: r.rows_affected(),
            cutoff,
        })
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "history", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for HistoryRepo {
    async fn samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, EngineError> {
        self.get_samples_between(host_id, start, end).await
    }

    async fn has_samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        HistoryRepo::has_samples_between(self, host_id, start, end).await
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {}", ms).into()))
}

fn parse_host_row(row: &SqliteRow) -> Result<Host, EngineError> {
    let id: i64 = row.try_get("id")?;
    let selected_raw: String = row.try_get("selected_metrics")?;
    let selected_metrics = serde_json::from_str::<SelectedMetrics>(&selected_raw)
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, host_id = id, "selected_metrics unreadable, using defaults");
            SelectedMetrics::default()
        });
    let poll: i64 = row.try_get("poll_interval_seconds")?;
    let last_seen: Option<i64> = row.try_get("last_seen_at")?;
    Ok(Host {
        id,
        name: row.try_get("name")?,
        poll_interval_seconds: u32::try_from(poll).unwrap_or(0),
        is_active: row.try_get("is_active")?,
        selected_metrics,
        last_seen_at: last_seen.map(millis_to_utc).transpose()?,
    })
}

fn parse_sample_row(row: &SqliteRow) -> Result<Sample, EngineError> {
    let reported_at: i64 = row.try_get("reported_at")?;
    let load_1: Option<f64> = row.try_get("load_1")?;
    let load_5: Option<f64> = row.try_get("load_5")?;
    let load_15: Option<f64> = row.try_get("load_15")?;
    let cpu_load = (load_1.is_some() || load_5.is_some() || load_15.is_some()).then_some(CpuLoad {
        one: load_1,
        five: load_5,
        fifteen: load_15,
    });
    let mounted_data: Vec<u8> = row.try_get("mounted_data")?;
    let network_data: Vec<u8> = row.try_get("network_data")?;
    let disk_temp_data: Vec<u8> = row.try_get("disk_temp_data")?;

    Ok(Sample {
        host_id: row.try_get("host_id")?,
        reported_at: millis_to_utc(reported_at)?,
        cpu_temperature_c: row.try_get("cpu_temperature_c")?,
        ram_used_percent: row.try_get("ram_used_percent")?,
        total_ram_gb: row.try_get("total_ram_gb")?,
        disk_usage_percent: row.try_get("disk_usage_percent")?,
        cpu_load,
        mounted_usage: deserialize_mounted_data(&mounted_data),
        network_counters: deserialize_network_data(&network_data),
        disk_temperatures: deserialize_disk_temp_data(&disk_temp_data),
        uptime_seconds: row.try_get("uptime_seconds")?,
    })
}

/// Deserialize mounted_data; on unknown/corrupt blob return empty vec and log.
fn deserialize_mounted_data(bytes: &[u8]) -> Vec<MountedVolume> {
    let Some(payload) = blob::blob_payload(bytes, blob::BLOB_VERSION) else {
        tracing::debug!("mounted_data blob has unknown version, using empty");
        return vec![];
    };
    wincode::deserialize(payload).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "wincode deserialize mounts (corrupt), using empty");
        vec![]
    })
}

fn deserialize_network_data(bytes: &[u8]) -> Vec<NetworkCounter> {
    let Some(payload) = blob::blob_payload(bytes, blob::BLOB_VERSION) else {
        tracing::debug!("network_data blob has unknown version, using empty");
        return vec![];
    };
    wincode::deserialize(payload).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "wincode deserialize network counters (corrupt), using empty");
        vec![]
    })
}

fn deserialize_disk_temp_data(bytes: &[u8]) -> Vec<DiskTemperature> {
    let Some(payload) = blob::blob_payload(bytes, blob::BLOB_VERSION) else {
        tracing::debug!("disk_temp_data blob has unknown version, using empty");
        return vec![];
    };
    wincode::deserialize(payload).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "wincode deserialize disk temperatures (corrupt), using empty");
        vec![]
    })
}
