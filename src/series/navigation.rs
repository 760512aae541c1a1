// Navigation scanner: nearest populated offset on each side of the current one.
//
// Each side probes exponentially growing segments of offsets ([o+1], [o+2], [o+3..o+4],
// [o+5..o+8], ...) with one "any sample in interval" query per segment, then binary-searches
// the first populated segment. That is O(log D) probes for a distance D to the nearest data.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use super::index::PopulatedIndex;
use super::source::SnapshotSource;
use super::window::{Range, offsets_span};
use crate::error::Result;
use crate::models::{HostId, NavigationResult};

/// Largest offset of `range` that can still hold data under `retention_days`.
pub fn retention_horizon(range: Range, retention_days: u32) -> u64 {
    let retention_secs = u64::from(retention_days) * 86_400;
    retention_secs.div_ceil(range.duration_secs() as u64)
}

pub struct NavigationScanner<'a> {
    source: &'a dyn SnapshotSource,
    index: Option<&'a PopulatedIndex>,
    host_id: HostId,
    range: Range,
    now: DateTime<Utc>,
    horizon: u64,
    probes: AtomicU32,
}

impl<'a> NavigationScanner<'a> {
    pub fn new(
        source: &'a dyn SnapshotSource,
        host_id: HostId,
        range: Range,
        now: DateTime<Utc>,
        horizon: u64,
    ) -> Self {
        Self {
            source,
            index: None,
            host_id,
            range,
            now,
            horizon,
            probes: AtomicU32::new(0),
        }
    }

    pub fn with_index(mut self, index: Option<&'a PopulatedIndex>) -> Self {
        self.index = index;
        self
    }

    /// Store queries issued so far (index hits are not counted).
    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::Relaxed)
    }

    pub async fn scan(&self, offset: u64) -> Result<NavigationResult> {
        let result = NavigationResult {
            previous_offset_with_data: self.previous(offset).await?,
            next_offset_with_data: self.next(offset).await?,
        };
        tracing::debug!(
            host_id = self.host_id,
            range = %self.range,
            offset,
            probes = self.probes(),
            previous = ?result.previous_offset_with_data,
            next = ?result.next_offset_with_data,
            "navigation scan"
        );
        Ok(result)
    }

    /// Nearest offset strictly greater than `offset` (further in the past) holding data.
    pub async fn previous(&self, offset: u64) -> Result<Option<u64>> {
        let mut searched = offset;
        let mut step: u64 = 1;
        loop {
            let lo = searched + 1;
            if lo > self.horizon {
                return Ok(None);
            }
            let hi = offset.saturating_add(step).min(self.horizon);
            if self.populated(lo, hi).await? {
                return self.nearest_from_below(lo, hi).await.map(Some);
            }
            searched = hi;
            step = step.saturating_mul(2);
        }
    }

    /// Nearest offset strictly smaller than `offset` (closer to now) holding data.
    pub async fn next(&self, offset: u64) -> Result<Option<u64>> {
        let mut searched = offset;
        let mut step: u64 = 1;
        loop {
            if searched == 0 {
                return Ok(None);
            }
            let hi = searched - 1;
            let lo = offset.saturating_sub(step);
            if self.populated(lo, hi).await? {
                return self.nearest_from_above(lo, hi).await.map(Some);
            }
            searched = lo;
            step = step.saturating_mul(2);
        }
    }

    /// Smallest populated offset in `lo..=hi`, given the whole segment holds data.
    async fn nearest_from_below(&self, mut lo: u64, mut hi: u64) -> Result<u64> {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.populated(lo, mid).await? {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    /// Largest populated offset in `lo..=hi`, given the whole segment holds data.
    async fn nearest_from_above(&self, mut lo: u64, mut hi: u64) -> Result<u64> {
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if self.populated(mid, hi).await? {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Ok(lo)
    }

    /// Whether any of the offsets `nearest..=farthest` holds a sample.
    async fn populated(&self, nearest: u64, farthest: u64) -> Result<bool> {
        let Some((start, end)) = offsets_span(self.range, nearest, farthest, self.now) else {
            return Ok(false);
        };
        if let Some(index) = self.index
            && index.rules_out(self.host_id, start, end)
        {
            return Ok(false);
        }
        self.probes.fetch_add(1, Ordering::Relaxed);
        self.source
            .has_samples_between(self.host_id, start, end)
            .await
    }
}
