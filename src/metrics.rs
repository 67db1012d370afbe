// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the knotmesh reconciler.
//!
//! All metrics live in a dedicated registry and are exposed on the
//! `/metrics` endpoint of a small axum server started from `main`.

use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

use crate::peer::ReconciliationResult;

/// Namespace prefix for all knotmesh metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "knotmesh";

/// Global Prometheus metrics registry, exposed via `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total reconciliation cycles by outcome (`committed`, `noop`, `error`)
pub static CYCLES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cycles_total"),
        "Total number of reconciliation cycles by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total peers merged into the local configuration
pub static PEERS_ADDED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        format!("{METRICS_NAMESPACE}_peers_added_total"),
        "Total number of peers merged into the local configuration",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Cycle errors by kind (`transient`, `malformed_record`, `fatal`,
/// `invalid_config`, `reload_failed`)
pub static CYCLE_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cycle_errors_total"),
        "Total number of cycle errors by kind",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Scheduler ticks dropped because a cycle was still running
pub static TICKS_DROPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        format!("{METRICS_NAMESPACE}_ticks_dropped_total"),
        "Total number of scheduler ticks dropped due to an in-flight cycle",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation cycles in seconds
pub static CYCLE_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_cycle_duration_seconds"),
        "Duration of reconciliation cycles in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Record the outcome of one finished cycle.
pub fn record_cycle(result: &ReconciliationResult, elapsed: Duration) {
    // Per-entry skips alone don't make the cycle an error; the cycle still
    // converged on everything that parsed.
    let failed = result
        .errors
        .iter()
        .any(|kind| *kind != crate::errors::ErrorKind::MalformedRecord);
    let outcome = if failed {
        "error"
    } else if result.unchanged {
        "noop"
    } else {
        "committed"
    };
    CYCLES_TOTAL.with_label_values(&[outcome]).inc();
    CYCLE_DURATION_SECONDS.observe(elapsed.as_secs_f64());
    PEERS_ADDED_TOTAL.inc_by(result.added.len() as u64);
    for kind in &result.errors {
        CYCLE_ERRORS_TOTAL.with_label_values(&[kind.as_str()]).inc();
    }
}

/// Record a scheduler tick dropped by the single-flight gate.
pub fn record_tick_dropped() {
    TICKS_DROPPED_TOTAL.inc();
}

/// Render the registry in Prometheus text exposition format.
#[must_use]
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
