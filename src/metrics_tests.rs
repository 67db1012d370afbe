// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for metrics recording and rendering.

use super::*;
use crate::errors::ErrorKind;
use crate::peer::Peer;

fn peer(site_id: &str) -> Peer {
    Peer {
        site_id: site_id.to_string(),
        address: "10.0.0.2".to_string(),
        zone: format!("{site_id}.mesh.internal"),
    }
}

#[test]
fn test_record_committed_cycle() {
    let added_before = PEERS_ADDED_TOTAL.get();
    let committed_before = CYCLES_TOTAL.with_label_values(&["committed"]).get();

    let result = ReconciliationResult::committed(vec![peer("siteB")], Vec::new());
    record_cycle(&result, Duration::from_millis(120));

    assert_eq!(PEERS_ADDED_TOTAL.get(), added_before + 1);
    assert!(CYCLES_TOTAL.with_label_values(&["committed"]).get() > committed_before);
}

#[test]
fn test_record_noop_cycle() {
    let noop_before = CYCLES_TOTAL.with_label_values(&["noop"]).get();
    record_cycle(
        &ReconciliationResult::unchanged(Vec::new()),
        Duration::from_millis(5),
    );
    assert!(CYCLES_TOTAL.with_label_values(&["noop"]).get() > noop_before);
}

#[test]
fn test_skips_alone_still_count_as_noop() {
    let noop_before = CYCLES_TOTAL.with_label_values(&["noop"]).get();
    let skips_before = CYCLE_ERRORS_TOTAL
        .with_label_values(&["malformed_record"])
        .get();

    record_cycle(
        &ReconciliationResult::unchanged(vec![ErrorKind::MalformedRecord]),
        Duration::from_millis(5),
    );

    assert!(CYCLES_TOTAL.with_label_values(&["noop"]).get() > noop_before);
    assert!(
        CYCLE_ERRORS_TOTAL
            .with_label_values(&["malformed_record"])
            .get()
            > skips_before
    );
}

#[test]
fn test_record_failed_cycle() {
    let error_before = CYCLES_TOTAL.with_label_values(&["error"]).get();
    let transient_before = CYCLE_ERRORS_TOTAL.with_label_values(&["transient"]).get();

    record_cycle(
        &ReconciliationResult::unchanged(vec![ErrorKind::Transient]),
        Duration::from_millis(5),
    );

    assert!(CYCLES_TOTAL.with_label_values(&["error"]).get() > error_before);
    assert!(CYCLE_ERRORS_TOTAL.with_label_values(&["transient"]).get() > transient_before);
}

#[test]
fn test_render_exposes_metric_families() {
    record_cycle(
        &ReconciliationResult::unchanged(Vec::new()),
        Duration::from_millis(5),
    );
    record_tick_dropped();

    let output = render();
    assert!(output.contains("knotmesh_cycles_total"));
    assert!(output.contains("knotmesh_cycle_duration_seconds"));
    assert!(output.contains("knotmesh_ticks_dropped_total"));
}
