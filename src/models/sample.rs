// Metric samples as reported by a host monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

use super::HostId;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CpuLoad {
    pub one: Option<f64>,
    pub five: Option<f64>,
    pub fifteen: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, SchemaRead, SchemaWrite, PartialEq)]
pub struct MountedVolume {
    pub mount_point: String,
    #[serde(default)]
    pub total_gb: Option<f64>,
    #[serde(default)]
    pub used_percent: Option<f64>,
}

/// Cumulative interface byte counters since the host's network stack came up.
#[derive(Debug, Clone, Serialize, Deserialize, SchemaRead, SchemaWrite, PartialEq)]
pub struct NetworkCounter {
    pub interface: String,
    #[serde(default)]
    pub bytes_sent: Option<f64>,
    #[serde(default)]
    pub bytes_recv: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, SchemaRead, SchemaWrite, PartialEq)]
pub struct DiskTemperature {
    pub device: String,
    #[serde(default)]
    pub temperature_c: Option<f64>,
}

/// One stored reading for one host at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub host_id: HostId,
    pub reported_at: DateTime<Utc>,
    pub cpu_temperature_c: Option<f64>,
    pub ram_used_percent: Option<f64>,
    pub total_ram_gb: Option<f64>,
    pub disk_usage_percent: Option<f64>,
    pub cpu_load: Option<CpuLoad>,
    pub mounted_usage: Vec<MountedVolume>,
    pub network_counters: Vec<NetworkCounter>,
    pub disk_temperatures: Vec<DiskTemperature>,
    pub uptime_seconds: Option<i64>,
}

impl Sample {
    /// Empty reading at `reported_at`; every metric absent.
    pub fn bare(host_id: HostId, reported_at: DateTime<Utc>) -> Self {
        Self {
            host_id,
            reported_at,
            cpu_temperature_c: None,
            ram_used_percent: None,
            total_ram_gb: None,
            disk_usage_percent: None,
            cpu_load: None,
            mounted_usage: vec![],
            network_counters: vec![],
            disk_temperatures: vec![],
            uptime_seconds: None,
        }
    }

    pub fn from_report(host_id: HostId, report: SampleReport) -> Self {
        Self {
            host_id,
            reported_at: report.reported_at,
            cpu_temperature_c: report.cpu_temperature_c,
            ram_used_percent: report.ram_used_percent,
            total_ram_gb: report.total_ram_gb,
            disk_usage_percent: report.disk_usage_percent,
            cpu_load: report.cpu_load,
            mounted_usage: report.mounted_usage.unwrap_or_default(),
            network_counters: report.network_counters.unwrap_or_default(),
            disk_temperatures: report.disk_temperatures.unwrap_or_default(),
            uptime_seconds: report.uptime_seconds,
        }
    }

    /// Instant the host last booted, as implied by its uptime counter.
    pub fn boot_time(&self) -> Option<DateTime<Utc>> {
        let uptime = self.uptime_seconds?;
        self.reported_at
            .checked_sub_signed(chrono::TimeDelta::try_seconds(uptime)?)
    }
}

/// Ingest payload (POST /api/metrics/{host_id}); `reported_at` defaults to receipt time.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleReport {
    #[serde(default = "Utc::now")]
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub cpu_temperature_c: Option<f64>,
    #[serde(default)]
    pub ram_used_percent: Option<f64>,
    #[serde(default)]
    pub total_ram_gb: Option<f64>,
    #[serde(default)]
    pub disk_usage_percent: Option<f64>,
    #[serde(default)]
    pub cpu_load: Option<CpuLoad>,
    #[serde(default)]
    pub mounted_usage: Option<Vec<MountedVolume>>,
    #[serde(default)]
    pub network_counters: Option<Vec<NetworkCounter>>,
    #[serde(default)]
    pub disk_temperatures: Option<Vec<DiskTemperature>>,
    #[serde(default)]
    pub uptime_seconds: Option<i64>,
}
