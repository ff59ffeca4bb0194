//! Window boundary and path naming tests for rapid-scan cycles.

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sate_common::time::{seconds_into_cycle, window_generation, AVAILABILITY_WINDOWS};
use sate_common::{resolve_scan_cycle, Band, Generation, PathNaming, ScanCycle};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

// ============================================================================
// Window table
// ============================================================================

#[test]
fn test_windows_cover_cycle_exactly_once() {
    for seconds in 0..600u32 {
        let hits = AVAILABILITY_WINDOWS
            .iter()
            .filter(|(range, _)| range.contains(&seconds))
            .count();
        assert_eq!(hits, 1, "second {} covered {} times", seconds, hits);
    }
}

#[test]
fn test_boundary_seconds() {
    assert_eq!(window_generation(0), Generation::R2);
    assert_eq!(window_generation(45), Generation::R2);
    assert_eq!(window_generation(46), Generation::R3);
    assert_eq!(window_generation(150), Generation::R3);
    assert_eq!(window_generation(151), Generation::R4);
    assert_eq!(window_generation(405), Generation::R4);
    assert_eq!(window_generation(406), Generation::R1);
    assert_eq!(window_generation(525), Generation::R1);
    assert_eq!(window_generation(526), Generation::R2);
    assert_eq!(window_generation(599), Generation::R2);
    // 600 is the next cycle's 0
    assert_eq!(window_generation(600), Generation::R2);
}

#[test]
fn test_seconds_into_cycle() {
    assert_eq!(seconds_into_cycle(at(2024, 1, 1, 0, 17, 42)), 462);
    assert_eq!(seconds_into_cycle(at(2024, 1, 1, 0, 20, 0)), 0);
}

// ============================================================================
// Resolver
// ============================================================================

#[test]
fn test_resolver_is_deterministic() {
    let mut t = at(2024, 3, 9, 22, 0, 0);
    let end = t + Duration::hours(3);
    while t < end {
        assert_eq!(resolve_scan_cycle(t), resolve_scan_cycle(t));
        t += Duration::seconds(7);
    }
}

#[test]
fn test_resolved_cycle_is_never_in_the_future() {
    let mut t = at(2024, 3, 9, 22, 0, 0);
    let end = t + Duration::hours(2);
    while t < end {
        let cycle = resolve_scan_cycle(t);
        assert!(cycle.nominal <= t, "{} resolved to future {}", t, cycle);
        assert!(t - cycle.nominal < Duration::minutes(20));
        t += Duration::seconds(1);
    }
}

#[test]
fn test_r2_crosses_day_boundary() {
    let cycle = resolve_scan_cycle(at(2024, 1, 1, 0, 0, 10));
    assert_eq!(cycle.generation, Generation::R2);
    assert_eq!(cycle.nominal, at(2023, 12, 31, 23, 52, 30));
}

#[test]
fn test_r3_crosses_hour_boundary() {
    let cycle = resolve_scan_cycle(at(2024, 2, 29, 10, 1, 0));
    assert_eq!(cycle.generation, Generation::R3);
    assert_eq!(cycle.nominal, at(2024, 2, 29, 9, 55, 0));
}

#[test]
fn test_r4_crosses_day_boundary() {
    let cycle = resolve_scan_cycle(at(2025, 1, 1, 0, 4, 0));
    assert_eq!(cycle.generation, Generation::R4);
    assert_eq!(cycle.nominal, at(2024, 12, 31, 23, 57, 30));
}

#[test]
fn test_subsecond_ignored() {
    let t = at(2024, 5, 5, 5, 6, 45) + Duration::milliseconds(999);
    let cycle = resolve_scan_cycle(t);
    assert_eq!(cycle.generation, Generation::R4);
    assert_eq!(cycle.nominal, at(2024, 5, 5, 4, 57, 30));
}

// ============================================================================
// Path round-trip
// ============================================================================

#[test]
fn test_paths_round_trip() {
    let naming = PathNaming::new("H08", "jma/hsd", "/var/tmp/sate", "bz2");
    let mut anchor = at(2024, 12, 31, 22, 0, 0);
    for _ in 0..24 {
        for generation in Generation::ALL {
            let cycle = ScanCycle::from_anchor(anchor, generation);
            for number in [1u16, 3, 7, 8, 13, 16] {
                let band = Band::new(number).unwrap();

                let remote = naming.remote_path(&cycle, band);
                assert_eq!(naming.parse_remote(&remote).unwrap(), (cycle, band), "{}", remote);

                let local = naming.local_path(&cycle, band);
                assert_eq!(naming.parse_local(&local).unwrap(), (cycle, band), "{:?}", local);
            }
        }
        anchor += Duration::minutes(10);
    }
}

#[test]
fn test_hour_buckets_sort_chronologically() {
    let naming = PathNaming::new("H08", "", Path::new("/b"), "bz2");
    let band = Band::new(13).unwrap();
    let early = resolve_scan_cycle(at(2024, 9, 30, 23, 59, 0));
    let late = resolve_scan_cycle(at(2024, 10, 1, 0, 9, 0));
    let bucket = |c: &ScanCycle| {
        naming
            .local_path(c, band)
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    };
    assert!(bucket(&early) < bucket(&late));
}
