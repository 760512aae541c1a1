// Ingestion writer: samples accepted over HTTP are batched into the history store by one task.
// The populated index is marked before each commit; cached navigation for the hosts is dropped after it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use crate::history_repo::HistoryRepo;
use crate::models::{HostId, Sample};
use crate::series::{PopulatedIndex, SeriesEngine};

/// Channel capacity for the ingest writer (backpressure if the writer falls behind).
pub fn writer_channel_capacity(flush_rate: u64) -> usize {
    (flush_rate as usize * 2).max(32)
}

pub struct IngestDeps {
    pub history_repo: Arc<HistoryRepo>,
    pub engine: Arc<SeriesEngine>,
    pub index: Option<Arc<PopulatedIndex>>,
    pub samples_saved_total: Arc<AtomicU64>,
}

pub struct IngestWriterConfig {
    pub flush_rate: u64,
    pub flush_interval_secs: u64,
}

/// Spawns the task that receives samples and flushes them to the DB.
/// Flushes when buffer len >= flush_rate, every flush_interval_secs, and when the channel closes.
pub fn spawn_ingest_writer(
    mut write_rx: mpsc::Receiver<Sample>,
    deps: IngestDeps,
    config: IngestWriterConfig,
) -> tokio::task::JoinHandle<()> {
    let flush_interval = Duration::from_secs(config.flush_interval_secs);
    tokio::spawn(async move {
        let mut buffer: Vec<Sample> = Vec::new();
        let mut flush_tick = interval(flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = write_rx.recv() => {
                    match result {
                        Some(sample) => {
                            buffer.push(sample);
                            if buffer.len() >= config.flush_rate as usize
                                && let Err(e) = flush_buffer(&deps, &mut buffer).await
                            {
                                tracing::warn!(error = %e, "ingest writer: save_samples failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = flush_tick.tick() => {
                    if let Err(e) = flush_buffer(&deps, &mut buffer).await {
                        tracing::warn!(error = %e, "ingest writer: save_samples failed");
                    }
                }
            }
        }
        if let Err(e) = flush_buffer(&deps, &mut buffer).await {
            tracing::warn!(error = %e, "ingest writer: final flush failed");
        }
        tracing::debug!("Ingest writer shutting down");
    })
}

async fn flush_buffer(deps: &IngestDeps, buffer: &mut Vec<Sample>) -> anyhow::Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let n = buffer.len();
    // Marks go in before the commit: a scan between commit and mark must not rule the batch out.
    if let Some(index) = &deps.index {
        for s in buffer.iter() {
            index.mark(s.host_id, s.reported_at);
        }
    }
    deps.history_repo.save_samples(buffer).await?;
    deps.samples_saved_total
        .fetch_add(n as u64, Ordering::Relaxed);

    let mut newest: BTreeMap<HostId, DateTime<Utc>> = BTreeMap::new();
    for s in buffer.iter() {
        newest
            .entry(s.host_id)
            .and_modify(|t| *t = (*t).max(s.reported_at))
            .or_insert(s.reported_at);
    }
    buffer.clear();

    for (host_id, seen_at) in newest {
        deps.engine.samples_ingested(host_id);
        if let Err(e) = deps.history_repo.touch_host(host_id, seen_at).await {
            tracing::warn!(error = %e, host_id, operation = "touch_host", "last_seen update failed");
        }
    }
    tracing::debug!(
        operation = "save_samples",
        samples_count = n,
        "Samples saved"
    );
    Ok(())
}
