// Series assembler: routes samples through per-line extractors and the gap synthesizer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::gaps::{self, GapPolicy};
use super::window::Window;
use crate::models::{Sample, SelectedMetrics, SeriesPoint, SeriesRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarMetric {
    #[serde(rename = "cpu_temperature_c")]
    CpuTemperature,
    #[serde(rename = "ram_used_percent")]
    RamUsedPercent,
    #[serde(rename = "disk_usage_percent")]
    DiskUsagePercent,
    #[serde(rename = "load_1")]
    Load1,
    #[serde(rename = "load_5")]
    Load5,
    #[serde(rename = "load_15")]
    Load15,
}

impl ScalarMetric {
    pub fn all() -> Vec<ScalarMetric> {
        vec![
            ScalarMetric::CpuTemperature,
            ScalarMetric::RamUsedPercent,
            ScalarMetric::DiskUsagePercent,
            ScalarMetric::Load1,
            ScalarMetric::Load5,
            ScalarMetric::Load15,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            ScalarMetric::CpuTemperature => "cpu_temperature_c",
            ScalarMetric::RamUsedPercent => "ram_used_percent",
            ScalarMetric::DiskUsagePercent => "disk_usage_percent",
            ScalarMetric::Load1 => "load_1",
            ScalarMetric::Load5 => "load_5",
            ScalarMetric::Load15 => "load_15",
        }
    }

    fn extract(self, sample: &Sample) -> Option<f64> {
        match self {
            ScalarMetric::CpuTemperature => sample.cpu_temperature_c,
            ScalarMetric::RamUsedPercent => sample.ram_used_percent,
            ScalarMetric::DiskUsagePercent => sample.disk_usage_percent,
            ScalarMetric::Load1 => sample.cpu_load.and_then(|l| l.one),
            ScalarMetric::Load5 => sample.cpu_load.and_then(|l| l.five),
            ScalarMetric::Load15 => sample.cpu_load.and_then(|l| l.fifteen),
        }
    }
}

/// Sub-series keyed by a name discovered in the data (mount path, interface, disk device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyedMetric {
    MountUsage,
    NetworkTx,
    NetworkRx,
    DiskTemperature,
}

impl KeyedMetric {
    pub fn prefix(self) -> &'static str {
        match self {
            KeyedMetric::MountUsage => "mount",
            KeyedMetric::NetworkTx => "net_tx",
            KeyedMetric::NetworkRx => "net_rx",
            KeyedMetric::DiskTemperature => "disk_temp",
        }
    }

    fn keys(self, sample: &Sample) -> Vec<&str> {
        match self {
            KeyedMetric::MountUsage => sample
                .mounted_usage
                .iter()
                .map(|m| m.mount_point.as_str())
                .collect(),
            KeyedMetric::NetworkTx | KeyedMetric::NetworkRx => sample
                .network_counters
                .iter()
                .map(|c| c.interface.as_str())
                .collect(),
            KeyedMetric::DiskTemperature => sample
                .disk_temperatures
                .iter()
                .map(|d| d.device.as_str())
                .collect(),
        }
    }

    fn extract(self, key: &str, cur: &Sample, prev: Option<&Sample>) -> Option<f64> {
        match self {
            KeyedMetric::MountUsage => cur
                .mounted_usage
                .iter()
                .find(|m| m.mount_point == key)?
                .used_percent,
            KeyedMetric::DiskTemperature => cur
                .disk_temperatures
                .iter()
                .find(|d| d.device == key)?
                .temperature_c,
            KeyedMetric::NetworkTx => byte_rate(key, cur, prev?, |c| c.bytes_sent),
            KeyedMetric::NetworkRx => byte_rate(key, cur, prev?, |c| c.bytes_recv),
        }
    }
}

/// Bytes per second between two cumulative counter readings; a counter reset reads as 0.
fn byte_rate(
    interface: &str,
    cur: &Sample,
    prev: &Sample,
    counter: impl Fn(&crate::models::NetworkCounter) -> Option<f64>,
) -> Option<f64> {
    let find = |s: &Sample| {
        s.network_counters
            .iter()
            .find(|c| c.interface == interface)
            .and_then(&counter)
    };
    let (now_bytes, then_bytes) = (find(cur)?, find(prev)?);
    let elapsed = (cur.reported_at - prev.reported_at).num_milliseconds() as f64 / 1000.0;
    if elapsed <= 0.0 {
        return None;
    }
    Some(((now_bytes - then_bytes) / elapsed).max(0.0))
}

/// One chart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricLine {
    Scalar(ScalarMetric),
    Keyed { kind: KeyedMetric, key: String },
}

impl MetricLine {
    pub fn keyed(kind: KeyedMetric, key: impl Into<String>) -> Self {
        MetricLine::Keyed {
            kind,
            key: key.into(),
        }
    }

    /// Stable record field name, e.g. `ram_used_percent` or `mount:/data`.
    pub fn key(&self) -> String {
        match self {
            MetricLine::Scalar(metric) => metric.key().to_string(),
            MetricLine::Keyed { kind, key } => format!("{}:{}", kind.prefix(), key),
        }
    }

    pub fn extract(&self, cur: &Sample, prev: Option<&Sample>) -> Option<f64> {
        match self {
            MetricLine::Scalar(metric) => metric.extract(cur),
            MetricLine::Keyed { kind, key } => kind.extract(key, cur, prev),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub line: MetricLine,
    pub points: Vec<SeriesPoint>,
    pub has_any_values: bool,
}

/// Lines to render for `selection` over this window's samples. Keyed lines come from the keys
/// actually present in `samples`; a selected key that never appears is omitted.
pub fn requested_lines(selection: &SelectedMetrics, samples: &[Sample]) -> Vec<MetricLine> {
    let mut lines: Vec<MetricLine> = Vec::new();
    let mut seen_scalars = BTreeSet::new();
    for &metric in &selection.scalars {
        if seen_scalars.insert(metric) {
            lines.push(MetricLine::Scalar(metric));
        }
    }

    let discover = |kind: KeyedMetric, filter: &[String]| -> BTreeSet<String> {
        samples
            .iter()
            .flat_map(|s| kind.keys(s))
            .filter(|k| filter.is_empty() || filter.iter().any(|f| f == k))
            .map(str::to_string)
            .collect()
    };

    for mount in discover(KeyedMetric::MountUsage, &selection.mounts) {
        lines.push(MetricLine::keyed(KeyedMetric::MountUsage, mount));
    }
    for iface in discover(KeyedMetric::NetworkTx, &selection.network_interfaces) {
        lines.push(MetricLine::keyed(KeyedMetric::NetworkTx, iface.clone()));
        lines.push(MetricLine::keyed(KeyedMetric::NetworkRx, iface));
    }
    if selection.disk_temperatures {
        for device in discover(KeyedMetric::DiskTemperature, &[]) {
            lines.push(MetricLine::keyed(KeyedMetric::DiskTemperature, device));
        }
    }
    lines
}

/// Runs every sample through each line's extractor, then through the gap synthesizer.
pub fn assemble(
    samples: &[Sample],
    lines: &[MetricLine],
    window: &Window,
    policy: &GapPolicy,
) -> Vec<LineSeries> {
    lines
        .iter()
        .map(|line| {
            let readings: Vec<_> = samples
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let prev = i.checked_sub(1).map(|j| &samples[j]);
                    (s.reported_at, line.extract(s, prev))
                })
                .collect();
            let points = gaps::synthesize(&readings, window, policy);
            LineSeries {
                line: line.clone(),
                has_any_values: gaps::has_any_values(&points),
                points,
            }
        })
        .collect()
}

/// Folds per-line sequences into per-timestamp records. Gap placement depends only on sample
/// timestamps, so every line shares one x-sequence and records are zipped by position.
pub fn merge_records(
    lines: &[LineSeries],
    samples: &[Sample],
    window: &Window,
    policy: &GapPolicy,
) -> Vec<SeriesRecord> {
    let timeline: Vec<SeriesPoint> = match lines.first() {
        Some(first) => first.points.clone(),
        None => {
            let readings: Vec<_> = samples.iter().map(|s| (s.reported_at, None)).collect();
            gaps::synthesize(&readings, window, policy)
        }
    };

    timeline
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let values: BTreeMap<String, Option<f64>> = lines
                .iter()
                .map(|l| (l.line.key(), l.points.get(i).and_then(|p| p.y)))
                .collect();
            SeriesRecord {
                reported_at: point.x,
                values,
            }
        })
        .collect()
}
