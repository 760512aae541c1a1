// Background maintenance: retention pruning every prune_interval_secs, populated-index trimming,
// and VACUUM on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::history_repo::{HistoryRepo, PruneReport};
use crate::series::PopulatedIndex;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MaintenanceWorkerConfig {
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

/// One-time startup pass: load every populated bucket from the store into the index.
#[instrument(skip_all, fields(bucket_secs = index.bucket_secs()))]
pub async fn hydrate_index(repo: &HistoryRepo, index: &PopulatedIndex) -> anyhow::Result<()> {
    let buckets = repo.populated_buckets(index.bucket_secs()).await?;
    for &(host_id, bucket) in &buckets {
        index.mark_bucket(host_id, bucket);
    }
    index.mark_complete();
    info!(buckets = buckets.len(), "populated index hydrated");
    Ok(())
}

/// Spawns the maintenance worker. Returns a join handle.
pub fn spawn(
    repo: Arc<HistoryRepo>,
    index: Option<Arc<PopulatedIndex>>,
    config: MaintenanceWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, index, config).await;
    })
}

#[instrument(skip(repo, index), fields(interval_secs = config.prune_interval_secs))]
async fn run(
    repo: Arc<HistoryRepo>,
    index: Option<Arc<PopulatedIndex>>,
    config: MaintenanceWorkerConfig,
) {
    let mut prune_interval = tokio::time::interval(Duration::from_secs(config.prune_interval_secs));
    prune_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = prune_interval.tick() => {
                if let Err(e) = run_one_pass(&repo, index.as_deref()).await {
                    warn!(error = %e, "retention pass failed");
                }
            }
            _ = vacuum_rx.recv() => {
                if let Err(e) = repo.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(config: MaintenanceWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// Deletes samples past retention and trims the index to match.
pub async fn run_one_pass(
    repo: &HistoryRepo,
    index: Option<&PopulatedIndex>,
) -> anyhow::Result<PruneReport> {
    let report = repo.prune_old_data().await?;
    if let Some(index) = index {
        index.trim_before(report.cutoff);
    }
    if report.deleted > 0 {
        info!(
            deleted = report.deleted,
            cutoff = %report.cutoff,
            "pruned samples past retention"
        );
    }
    Ok(report)
}
