// Metric time-series windowing engine: window resolution, point selection, gap synthesis,
// navigation between populated windows, reboot markers and series assembly.

pub mod assembler;
pub mod cache;
pub mod gaps;
pub mod index;
pub mod navigation;
pub mod reboot;
pub mod source;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::instrument;

pub use assembler::{KeyedMetric, LineSeries, MetricLine, ScalarMetric};
pub use cache::NavigationCache;
pub use gaps::GapPolicy;
pub use index::PopulatedIndex;
pub use navigation::NavigationScanner;
pub use source::{SnapshotSource, select_points};
pub use window::{Range, Window};

use crate::error::Result;
use crate::models::{Host, HostId, LineSummary, NavigationResult, SeriesResponse};

/// Numeric knobs shared by the gap synthesizer, reboot detection and navigation.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub min_poll_interval_secs: u32,
    pub gap_factor: u32,
    /// `None` uses the host's expected poll interval.
    pub reboot_tolerance_secs: Option<u32>,
    pub retention_days: u32,
    pub navigation_cache_ttl: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_poll_interval_secs: gaps::MIN_EXPECTED_INTERVAL_SECS,
            gap_factor: gaps::DEFAULT_GAP_FACTOR,
            reboot_tolerance_secs: None,
            retention_days: 7,
            navigation_cache_ttl: Duration::ZERO,
        }
    }
}

pub struct SeriesEngine {
    source: Arc<dyn SnapshotSource>,
    index: Option<Arc<PopulatedIndex>>,
    cache: NavigationCache,
    settings: EngineSettings,
}

impl SeriesEngine {
    pub fn new(source: Arc<dyn SnapshotSource>, settings: EngineSettings) -> Self {
        Self {
            source,
            index: None,
            cache: NavigationCache::new(settings.navigation_cache_ttl),
            settings,
        }
    }

    pub fn with_index(mut self, index: Arc<PopulatedIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn gap_policy(&self, host: &Host) -> GapPolicy {
        GapPolicy::new(
            host.poll_interval_seconds,
            self.settings.min_poll_interval_secs,
            self.settings.gap_factor,
        )
    }

    /// Called after new samples for `host_id` are stored.
    pub fn samples_ingested(&self, host_id: HostId) {
        self.cache.invalidate_host(host_id);
    }

    pub async fn navigation(
        &self,
        host_id: HostId,
        range: Range,
        offset: u64,
        now: DateTime<Utc>,
    ) -> Result<NavigationResult> {
        if let Some(hit) = self.cache.get(host_id, range, offset) {
            return Ok(hit);
        }
        let horizon = navigation::retention_horizon(range, self.settings.retention_days);
        let result = NavigationScanner::new(self.source.as_ref(), host_id, range, now, horizon)
            .with_index(self.index.as_deref())
            .scan(offset)
            .await?;
        self.cache.insert(host_id, range, offset, result);
        Ok(result)
    }

    /// Full chart payload for one host window. Every step uses the same `now`.
    #[instrument(skip_all, fields(host_id = host.id, range = %range, offset = offset))]
    pub async fn series(
        &self,
        host: &Host,
        range: Range,
        offset: i64,
        now: DateTime<Utc>,
    ) -> Result<SeriesResponse> {
        let window = window::resolve(range, offset, now)?;
        let nav = self.navigation(host.id, range, window.offset, now).await?;
        let samples = select_points(self.source.as_ref(), host.id, &window).await?;

        let policy = self.gap_policy(host);
        let tolerance = reboot::tolerance(&policy, self.settings.reboot_tolerance_secs);
        let reboot_markers = reboot::reboot_markers(&samples, tolerance);

        let lines = assembler::requested_lines(&host.selected_metrics, &samples);
        let series = assembler::assemble(&samples, &lines, &window, &policy);
        let points = assembler::merge_records(&series, &samples, &window, &policy);

        tracing::debug!(
            samples = samples.len(),
            lines = series.len(),
            points = points.len(),
            reboots = reboot_markers.len(),
            "series assembled"
        );

        Ok(SeriesResponse {
            host_id: host.id,
            range: range.to_string(),
            window_offset: window.offset,
            window_start: window.start,
            window_end: window.end,
            previous_offset_with_data: nav.previous_offset_with_data,
            next_offset_with_data: nav.next_offset_with_data,
            lines: series
                .iter()
                .map(|l| LineSummary {
                    key: l.line.key(),
                    has_any_values: l.has_any_values,
                })
                .collect(),
            points,
            reboot_markers,
        })
    }
}
