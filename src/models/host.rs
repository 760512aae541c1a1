// Monitored host configuration record (owned by the host registry, read by the series engine)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sample;
use crate::series::ScalarMetric;

pub type HostId = i64;

/// Poll interval assumed for hosts registered without one.
pub const DEFAULT_POLL_INTERVAL_SECS: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Host {
    pub id: HostId,
    pub name: String,
    pub poll_interval_seconds: u32,
    pub is_active: bool,
    pub selected_metrics: SelectedMetrics,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// GET /api/hosts entry: the host record plus its newest stored sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostOverview {
    #[serde(flatten)]
    pub host: Host,
    pub latest_sample: Option<Sample>,
}

/// Registration payload for POST /api/hosts.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHost {
    pub name: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u32,
    #[serde(default)]
    pub selected_metrics: SelectedMetrics,
}

fn default_poll_interval() -> u32 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Which chart lines a host renders. Empty key filters mean "every key seen in the window".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectedMetrics {
    #[serde(default = "ScalarMetric::all")]
    pub scalars: Vec<ScalarMetric>,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub network_interfaces: Vec<String>,
    #[serde(default = "default_true")]
    pub disk_temperatures: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SelectedMetrics {
    fn default() -> Self {
        Self {
            scalars: ScalarMetric::all(),
            mounts: Vec::new(),
            network_interfaces: Vec::new(),
            disk_temperatures: true,
        }
    }
}
