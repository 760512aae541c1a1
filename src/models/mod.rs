// Domain models: host configuration records, samples and chart output.

mod host;
mod sample;
mod series;

pub use host::{DEFAULT_POLL_INTERVAL_SECS, Host, HostId, HostOverview, NewHost, SelectedMetrics};
pub use sample::{CpuLoad, DiskTemperature, MountedVolume, NetworkCounter, Sample, SampleReport};
pub use series::{LineSummary, NavigationResult, SeriesPoint, SeriesRecord, SeriesResponse};
