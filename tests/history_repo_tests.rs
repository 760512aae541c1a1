// HistoryRepo tests: connect, init, hosts, save/select samples, buckets, prune

mod common;

use chrono::{DurationRound, TimeDelta, Utc};
use common::{sample_at, temp_repo, test_host};
use hostwatch::models::*;
use hostwatch::series::window::{self, Range};
use hostwatch::series::{EngineSettings, SeriesEngine, SnapshotSource};
use std::sync::Arc;

fn new_host(name: &str) -> NewHost {
    NewHost {
        name: name.into(),
        poll_interval_seconds: 60,
        selected_metrics: SelectedMetrics::default(),
    }
}

/// Current time truncated to whole milliseconds (storage precision).
fn now_ms() -> chrono::DateTime<Utc> {
    Utc::now()
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap()
}

fn full_sample(host_id: HostId, at: chrono::DateTime<Utc>) -> Sample {
    Sample {
        host_id,
        reported_at: at,
        cpu_temperature_c: Some(51.5),
        ram_used_percent: Some(33.0),
        total_ram_gb: Some(16.0),
        disk_usage_percent: Some(71.2),
        cpu_load: Some(CpuLoad {
            one: Some(1.0),
            five: None,
            fifteen: Some(0.25),
        }),
        mounted_usage: vec![MountedVolume {
            mount_point: "/srv".into(),
            total_gb: Some(500.0),
            used_percent: Some(12.0),
        }],
        network_counters: vec![NetworkCounter {
            interface: "eth0".into(),
            bytes_sent: Some(1.0e9),
            bytes_recv: None,
        }],
        disk_temperatures: vec![DiskTemperature {
            device: "nvme0n1".into(),
            temperature_c: Some(41.0),
        }],
        uptime_seconds: Some(123_456),
    }
}

#[tokio::test]
async fn history_repo_connect_and_init() {
    let (_dir, repo) = temp_repo(7).await;
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert_eq!(repo.retention_days(), 7);
}

#[tokio::test]
async fn register_and_list_hosts() {
    let (_dir, repo) = temp_repo(7).await;
    let b = repo.register_host(&new_host("beta")).await.unwrap();
    let a = repo
        .register_host(&NewHost {
            selected_metrics: SelectedMetrics {
                network_interfaces: vec!["eth0".into()],
                ..SelectedMetrics::default()
            },
            ..new_host("alpha")
        })
        .await
        .unwrap();

    let hosts = repo.list_hosts().await.unwrap();
    assert_eq!(hosts.iter().map(|h| h.name.as_str()).collect::<Vec<_>>(), ["alpha", "beta"]);

    let stored = repo.get_host(a.id).await.unwrap().unwrap();
    assert_eq!(stored, a);
    assert_eq!(stored.selected_metrics.network_interfaces, vec!["eth0".to_string()]);
    assert!(repo.get_host(b.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_host_name_is_rejected() {
    let (_dir, repo) = temp_repo(7).await;
    repo.register_host(&new_host("alpha")).await.unwrap();
    assert!(repo.register_host(&new_host("alpha")).await.is_err());
}

#[tokio::test]
async fn touch_host_keeps_the_newest_instant() {
    let (_dir, repo) = temp_repo(7).await;
    let host = repo.register_host(&new_host("alpha")).await.unwrap();
    let t = now_ms();
    repo.touch_host(host.id, t).await.unwrap();
    repo.touch_host(host.id, t - TimeDelta::minutes(5)).await.unwrap();
    let stored = repo.get_host(host.id).await.unwrap().unwrap();
    assert_eq!(stored.last_seen_at, Some(t));
}

#[tokio::test]
async fn save_and_read_back_full_sample() {
    let (_dir, repo) = temp_repo(7).await;
    let t = now_ms();
    let sample = full_sample(1, t);
    repo.save_samples(std::slice::from_ref(&sample)).await.unwrap();

    let got = repo
        .get_samples_between(1, t - TimeDelta::minutes(1), t + TimeDelta::minutes(1))
        .await
        .unwrap();
    assert_eq!(got, vec![sample]);
}

#[tokio::test]
async fn missing_loads_read_back_as_none() {
    let (_dir, repo) = temp_repo(7).await;
    let t = now_ms();
    repo.save_samples(&[Sample::bare(1, t)]).await.unwrap();
    let got = repo.get_recent_samples(1, 10).await.unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].cpu_load, None);
    assert!(got[0].mounted_usage.is_empty());
}

#[tokio::test]
async fn selection_is_half_open_and_per_host() {
    let (_dir, repo) = temp_repo(7).await;
    let start = now_ms() - TimeDelta::hours(1);
    let end = start + TimeDelta::minutes(10);
    repo.save_samples(&[
        sample_at(1, start),
        sample_at(1, start + TimeDelta::minutes(5)),
        sample_at(1, end),
        sample_at(2, start + TimeDelta::minutes(1)),
    ])
    .await
    .unwrap();

    let got = repo.samples_between(1, start, end).await.unwrap();
    assert_eq!(
        got.iter().map(|s| s.reported_at).collect::<Vec<_>>(),
        vec![start, start + TimeDelta::minutes(5)]
    );
    assert!(repo.has_samples_between(2, start, end).await.unwrap());
    assert!(!repo.has_samples_between(2, end, end + TimeDelta::hours(1)).await.unwrap());
}

#[tokio::test]
async fn samples_come_back_ascending() {
    let (_dir, repo) = temp_repo(7).await;
    let t = now_ms();
    repo.save_samples(&[
        sample_at(1, t),
        sample_at(1, t - TimeDelta::minutes(2)),
        sample_at(1, t - TimeDelta::minutes(1)),
    ])
    .await
    .unwrap();
    let got = repo
        .get_samples_between(1, t - TimeDelta::hours(1), t + TimeDelta::seconds(1))
        .await
        .unwrap();
    assert!(got.is_sorted_by_key(|s| s.reported_at));
    assert_eq!(got.len(), 3);

    let recent = repo.get_recent_samples(1, 2).await.unwrap();
    assert_eq!(
        recent.iter().map(|s| s.reported_at).collect::<Vec<_>>(),
        vec![t - TimeDelta::minutes(1), t]
    );
}

#[tokio::test]
async fn history_repo_save_empty_no_op() {
    let (_dir, repo) = temp_repo(7).await;
    repo.save_samples(&[]).await.unwrap();
    assert!(repo.get_recent_samples(1, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn populated_buckets_are_distinct_per_host() {
    let (_dir, repo) = temp_repo(7).await;
    let base = chrono::DateTime::from_timestamp(3_000_000, 0).unwrap();
    repo.save_samples(&[
        sample_at(1, base),
        sample_at(1, base + TimeDelta::seconds(10)),
        sample_at(1, base + TimeDelta::seconds(300)),
        sample_at(2, base),
    ])
    .await
    .unwrap();
    let mut buckets = repo.populated_buckets(300).await.unwrap();
    buckets.sort();
    assert_eq!(buckets, vec![(1, 10_000), (1, 10_001), (2, 10_000)]);
}

#[tokio::test]
async fn history_repo_prune_old_data() {
    let (_dir, repo) = temp_repo(7).await;
    let now = now_ms();
    let old = now - TimeDelta::days(8);
    repo.save_samples(&[sample_at(1, old), sample_at(1, now)])
        .await
        .unwrap();
    assert_eq!(repo.get_recent_samples(1, 10).await.unwrap().len(), 2);

    let report = repo.prune_old_data().await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(report.cutoff > old && report.cutoff < now);

    let after = repo.get_recent_samples(1, 10).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].reported_at, now);

    repo.vacuum().await.unwrap();
}

#[tokio::test]
async fn edge_sample_lands_in_exactly_one_window_with_sub_millisecond_now() {
    let (_dir, repo) = temp_repo(7).await;
    let repo = Arc::new(repo);
    let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 12, 0, 0).unwrap()
        + TimeDelta::microseconds(500);
    let at = now.duration_trunc(TimeDelta::hours(1)).unwrap() - TimeDelta::hours(1);
    repo.save_samples(&[sample_at(1, at)]).await.unwrap();

    let engine = SeriesEngine::new(repo.clone(), EngineSettings::default());
    let host = test_host(1, 60);
    let mut holding = Vec::new();
    for offset in 0..2 {
        let series = engine.series(&host, Range::Hourly, offset, now).await.unwrap();
        if series.points.iter().any(|p| p.reported_at == at) {
            holding.push(offset);
        }
        let w = window::resolve(Range::Hourly, offset, now).unwrap();
        assert_eq!(
            repo.has_samples_between(1, w.start, w.end).await.unwrap(),
            w.contains(at),
            "offset {offset}"
        );
    }
    assert_eq!(holding, vec![0]);

    let nav = engine.navigation(1, Range::Hourly, 1, now).await.unwrap();
    assert_eq!(nav.next_offset_with_data, Some(0));
}

#[tokio::test]
async fn latest_sample_is_the_newest_per_host() {
    let (_dir, repo) = temp_repo(7).await;
    let t = now_ms();
    assert!(repo.get_latest_sample(1).await.unwrap().is_none());
    repo.save_samples(&[
        sample_at(1, t - TimeDelta::minutes(1)),
        sample_at(1, t),
        sample_at(2, t + TimeDelta::minutes(1)),
    ])
    .await
    .unwrap();
    let latest = repo.get_latest_sample(1).await.unwrap().unwrap();
    assert_eq!(latest.reported_at, t);
    assert_eq!(latest.host_id, 1);
}
