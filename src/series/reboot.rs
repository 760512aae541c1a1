// Reboot markers inferred from jumps in the host's implied boot time (reported_at - uptime).

use chrono::{DateTime, TimeDelta, Utc};

use super::gaps::GapPolicy;
use crate::models::Sample;

/// Boot-time drift tolerated between consecutive samples. Defaults to the expected poll interval;
/// clock drift and polling jitter stay well below it.
pub fn tolerance(policy: &GapPolicy, configured_secs: Option<u32>) -> TimeDelta {
    configured_secs
        .map(|s| TimeDelta::seconds(i64::from(s)))
        .unwrap_or(policy.expected_interval)
}

/// Marker at `cur.reported_at` for every consecutive pair whose implied boot times differ by more
/// than `tolerance`. Pairs where either sample lacks uptime produce nothing.
pub fn reboot_markers(samples: &[Sample], tolerance: TimeDelta) -> Vec<DateTime<Utc>> {
    samples
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            let drift = cur.boot_time()? - prev.boot_time()?;
            (drift.abs() > tolerance).then_some(cur.reported_at)
        })
        .collect()
}
