// Gap synthesizer: explicit "no data" markers between sparse samples and at window edges.
//
// The thresholds here must match what the chart renders; a mismatch shows up as false gaps
// or as lines drawn straight across missing data.

use chrono::{DateTime, TimeDelta, Utc};

use super::window::Window;
use crate::models::SeriesPoint;

/// Floor for a host's expected sample spacing, whatever its configured poll interval.
pub const MIN_EXPECTED_INTERVAL_SECS: u32 = 30;

/// Spacing beyond `GAP_FACTOR * expected_interval` breaks the line.
pub const DEFAULT_GAP_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapPolicy {
    pub expected_interval: TimeDelta,
    pub gap_threshold: TimeDelta,
}

impl GapPolicy {
    pub fn new(poll_interval_secs: u32, min_interval_secs: u32, gap_factor: u32) -> Self {
        let expected_secs = i64::from(poll_interval_secs.max(min_interval_secs));
        Self {
            expected_interval: TimeDelta::seconds(expected_secs),
            gap_threshold: TimeDelta::seconds(expected_secs * i64::from(gap_factor)),
        }
    }

    pub fn for_poll_interval(poll_interval_secs: u32) -> Self {
        Self::new(
            poll_interval_secs,
            MIN_EXPECTED_INTERVAL_SECS,
            DEFAULT_GAP_FACTOR,
        )
    }
}

/// Emits one chart line from its raw readings (ascending `(reported_at, value)` pairs, one per
/// sample, value possibly absent).
///
/// * empty input yields exactly `[start: absent, end: absent]`;
/// * a pair spaced more than `gap_threshold` apart gets an absent marker at
///   `max(start, prev + expected_interval)` before the later reading;
/// * edges further than `gap_threshold` from the first/last reading are padded with absent
///   points at `start` / `end`.
pub fn synthesize(
    readings: &[(DateTime<Utc>, Option<f64>)],
    window: &Window,
    policy: &GapPolicy,
) -> Vec<SeriesPoint> {
    let (Some(&(first, _)), Some(&(last, _))) = (readings.first(), readings.last()) else {
        return vec![
            SeriesPoint::absent(window.start),
            SeriesPoint::absent(window.end),
        ];
    };

    let mut out = Vec::with_capacity(readings.len() + 2);
    if first - window.start > policy.gap_threshold {
        out.push(SeriesPoint::absent(window.start));
    }

    let mut prev: Option<DateTime<Utc>> = None;
    for &(t, y) in readings {
        if let Some(p) = prev
            && t - p > policy.gap_threshold
        {
            out.push(SeriesPoint::absent(
                window.start.max(p + policy.expected_interval),
            ));
        }
        out.push(SeriesPoint::value(t, y));
        prev = Some(t);
    }

    if window.end - last > policy.gap_threshold {
        out.push(SeriesPoint::absent(window.end));
    }
    out
}

/// Whether a line carries at least one real reading (otherwise the UI shows an empty state).
pub fn has_any_values(points: &[SeriesPoint]) -> bool {
    points.iter().any(|p| p.y.is_some())
}
