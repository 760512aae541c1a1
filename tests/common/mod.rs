// Shared test helpers: an in-memory snapshot source and sample builders

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use hostwatch::error::Result;
use hostwatch::history_repo::HistoryRepo;
use hostwatch::models::*;
use hostwatch::series::{Range, SnapshotSource};
use tempfile::TempDir;

/// Fixed reference instant so window arithmetic is reproducible.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Midpoint of window `offset` of `range`, counted back from `now`.
pub fn inside_offset(range: Range, offset: u64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - range.duration() * (offset as i32) - range.duration() / 2
}

pub fn sample_at(host_id: HostId, reported_at: DateTime<Utc>) -> Sample {
    Sample {
        cpu_temperature_c: Some(45.0),
        ram_used_percent: Some(50.0),
        ..Sample::bare(host_id, reported_at)
    }
}

/// Samples every `step_secs` from `start` (inclusive) to `end` (exclusive).
pub fn samples_every(
    host_id: HostId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_secs: i64,
) -> Vec<Sample> {
    let mut out = Vec::new();
    let mut t = start;
    while t < end {
        out.push(sample_at(host_id, t));
        t += TimeDelta::seconds(step_secs);
    }
    out
}

pub fn with_uptime(mut sample: Sample, uptime_seconds: i64) -> Sample {
    sample.uptime_seconds = Some(uptime_seconds);
    sample
}

pub fn test_host(id: HostId, poll_interval_seconds: u32) -> Host {
    Host {
        id,
        name: format!("host-{}", id),
        poll_interval_seconds,
        is_active: true,
        selected_metrics: SelectedMetrics::default(),
        last_seen_at: None,
    }
}

/// In-memory store that counts every query it answers.
#[derive(Default)]
pub struct MemorySource {
    samples: Mutex<Vec<Sample>>,
    range_queries: AtomicU32,
    existence_queries: AtomicU32,
}

impl MemorySource {
    pub fn with_samples(samples: Vec<Sample>) -> Self {
        let source = Self::default();
        source.push(samples);
        source
    }

    pub fn push(&self, samples: Vec<Sample>) {
        let mut stored = self.samples.lock().unwrap();
        stored.extend(samples);
        stored.sort_by_key(|s| s.reported_at);
    }

    pub fn range_queries(&self) -> u32 {
        self.range_queries.load(Ordering::Relaxed)
    }

    pub fn existence_queries(&self) -> u32 {
        self.existence_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        self.range_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.host_id == host_id && start <= s.reported_at && s.reported_at < end)
            .cloned()
            .collect())
    }

    async fn has_samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        self.existence_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .samples
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.host_id == host_id && start <= s.reported_at && s.reported_at < end))
    }
}

/// Fresh initialized store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn temp_repo(retention_days: u32) -> (TempDir, HistoryRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 2, retention_days)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}
