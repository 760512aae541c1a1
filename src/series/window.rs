// Window resolver: (range, offset) -> absolute [start, end) interval counted back from `now`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    Hourly,
    Daily,
    Weekly,
}

impl Range {
    pub const ALL: [Range; 3] = [Range::Hourly, Range::Daily, Range::Weekly];

    pub fn duration_secs(self) -> i64 {
        match self {
            Range::Hourly => 3_600,
            Range::Daily => 86_400,
            Range::Weekly => 604_800,
        }
    }

    pub fn duration(self) -> TimeDelta {
        TimeDelta::seconds(self.duration_secs())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Range::Hourly => "hourly",
            Range::Daily => "daily",
            Range::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Range::Hourly),
            "daily" => Ok(Range::Daily),
            "weekly" => Ok(Range::Weekly),
            _ => Err(EngineError::InvalidRange(s.to_string())),
        }
    }
}

/// A resolved chart window. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub range: Range,
    pub offset: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Window `offset` whole durations before the one ending at `now`.
    pub fn resolve(range: Range, offset: u64, now: DateTime<Utc>) -> Result<Self> {
        let end = offset_end(range, offset, now).ok_or(EngineError::InvalidOffset(
            i64::try_from(offset).unwrap_or(i64::MAX),
        ))?;
        let start = end - range.duration();
        Ok(Self {
            range,
            offset,
            start,
            end,
        })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Validates a caller-supplied offset and resolves the window.
pub fn resolve(range: Range, offset: i64, now: DateTime<Utc>) -> Result<Window> {
    let offset = u64::try_from(offset).map_err(|_| EngineError::InvalidOffset(offset))?;
    Window::resolve(range, offset, now)
}

/// Same as [`resolve`] for a range given by name (query string input).
pub fn resolve_named(range: &str, offset: i64, now: DateTime<Utc>) -> Result<Window> {
    resolve(range.parse()?, offset, now)
}

/// `now` cut to whole milliseconds, the precision samples are stored at. Window edges built
/// from it compare the same way in SQL and in [`Window::contains`].
pub fn store_precision(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// End instant of window `offset`; `None` when it falls outside chrono's representable range.
pub(crate) fn offset_end(range: Range, offset: u64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(offset)
        .ok()?
        .checked_mul(range.duration_secs())?;
    store_precision(now).checked_sub_signed(TimeDelta::try_seconds(secs)?)
}

/// Half-open interval covered by the contiguous offsets `nearest..=farthest`.
pub(crate) fn offsets_span(
    range: Range,
    nearest: u64,
    farthest: u64,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    debug_assert!(nearest <= farthest);
    let end = offset_end(range, nearest, now)?;
    let start = offset_end(range, farthest.checked_add(1)?, now)?;
    Some((start, end))
}
