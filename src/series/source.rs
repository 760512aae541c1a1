// Snapshot source seam and the point selector built on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::window::Window;
use crate::error::Result;
use crate::models::{HostId, Sample};

/// Read access to a host's stored samples. Implemented by the SQLite history store;
/// tests plug in an in-memory source.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Samples of `host_id` with `start <= reported_at < end`, ascending, read in one query.
    async fn samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>>;

    /// Whether at least one sample of `host_id` lies in `[start, end)`.
    async fn has_samples_between(
        &self,
        host_id: HostId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Samples of `host_id` inside `window`, ascending by `reported_at`. Empty is a valid result.
pub async fn select_points(
    source: &dyn SnapshotSource,
    host_id: HostId,
    window: &Window,
) -> Result<Vec<Sample>> {
    let mut samples = source
        .samples_between(host_id, window.start, window.end)
        .await?;
    samples.retain(|s| s.host_id == host_id && window.contains(s.reported_at));
    if !samples.is_sorted_by_key(|s| s.reported_at) {
        samples.sort_by_key(|s| s.reported_at);
    }
    Ok(samples)
}
