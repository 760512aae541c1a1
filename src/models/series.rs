// Chart-facing output of the series engine

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HostId;

/// One emitted point of one chart line. `y == None` is a gap or padding marker, never a zero reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub x: DateTime<Utc>,
    pub y: Option<f64>,
}

impl SeriesPoint {
    pub fn value(x: DateTime<Utc>, y: Option<f64>) -> Self {
        Self { x, y }
    }

    pub fn absent(x: DateTime<Utc>) -> Self {
        Self { x, y: None }
    }
}

/// Nearest populated offsets on either side of a queried offset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationResult {
    /// Nearest strictly larger offset (further in the past) holding data.
    pub previous_offset_with_data: Option<u64>,
    /// Nearest strictly smaller offset (closer to now) holding data.
    pub next_offset_with_data: Option<u64>,
}

/// Per-timestamp record: every rendered line's value at `reported_at`, keyed by line key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesRecord {
    pub reported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineSummary {
    pub key: String,
    pub has_any_values: bool,
}

/// GET /api/hosts/{host_id}/series response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesResponse {
    pub host_id: HostId,
    pub range: String,
    pub window_offset: u64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub previous_offset_with_data: Option<u64>,
    pub next_offset_with_data: Option<u64>,
    pub points: Vec<SeriesRecord>,
    pub lines: Vec<LineSummary>,
    pub reboot_markers: Vec<DateTime<Utc>>,
}
