// Reboot detection from implied boot time

mod common;

use chrono::TimeDelta;
use common::{fixed_now, sample_at, with_uptime};
use hostwatch::series::GapPolicy;
use hostwatch::series::reboot::{reboot_markers, tolerance};

const HOST: i64 = 1;

#[test]
fn steady_uptime_has_no_markers() {
    let t0 = fixed_now();
    let samples: Vec<_> = (0..10)
        .map(|i| with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(60 * i)), 5_000 + 60 * i))
        .collect();
    assert!(reboot_markers(&samples, TimeDelta::seconds(60)).is_empty());
}

#[test]
fn uptime_reset_marks_the_first_sample_after_boot() {
    let t0 = fixed_now();
    let samples = vec![
        with_uptime(sample_at(HOST, t0), 10_000),
        with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(60)), 10_060),
        with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(120)), 30),
        with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(180)), 90),
    ];
    let markers = reboot_markers(&samples, TimeDelta::seconds(60));
    assert_eq!(markers, vec![t0 + TimeDelta::seconds(120)]);
}

#[test]
fn jitter_within_tolerance_is_ignored() {
    let t0 = fixed_now();
    let samples = vec![
        with_uptime(sample_at(HOST, t0), 1_000),
        // Poll arrived 20 s late relative to its uptime reading.
        with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(80)), 1_060),
    ];
    assert!(reboot_markers(&samples, TimeDelta::seconds(60)).is_empty());
}

#[test]
fn reboot_across_a_gap_is_still_detected() {
    let t0 = fixed_now();
    let samples = vec![
        with_uptime(sample_at(HOST, t0), 50_000),
        with_uptime(sample_at(HOST, t0 + TimeDelta::hours(3)), 600),
    ];
    assert_eq!(
        reboot_markers(&samples, TimeDelta::seconds(60)),
        vec![t0 + TimeDelta::hours(3)]
    );
}

#[test]
fn missing_uptime_produces_no_marker() {
    let t0 = fixed_now();
    let samples = vec![
        with_uptime(sample_at(HOST, t0), 10_000),
        sample_at(HOST, t0 + TimeDelta::seconds(60)),
        with_uptime(sample_at(HOST, t0 + TimeDelta::seconds(120)), 10_120),
    ];
    assert!(reboot_markers(&samples, TimeDelta::seconds(60)).is_empty());
}

#[test]
fn fewer_than_two_samples() {
    assert!(reboot_markers(&[], TimeDelta::seconds(60)).is_empty());
    let one = vec![with_uptime(sample_at(HOST, fixed_now()), 5)];
    assert!(reboot_markers(&one, TimeDelta::seconds(60)).is_empty());
}

#[test]
fn tolerance_defaults_to_expected_interval() {
    let policy = GapPolicy::for_poll_interval(120);
    assert_eq!(tolerance(&policy, None), TimeDelta::seconds(120));
    assert_eq!(tolerance(&policy, Some(300)), TimeDelta::seconds(300));
}
