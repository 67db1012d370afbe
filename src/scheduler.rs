// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic scheduler with a single-flight guarantee.
//!
//! At most one cycle runs per site at any time: each tick tries to take the
//! cycle lock and a tick that finds it held is dropped with a warning, never
//! queued. The next tick re-observes current state, so dropping loses
//! nothing. A failed cycle never takes the scheduler down with it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::reconciler::{PeerSource, Reconciler};

/// Run reconciliation cycles forever at a fixed interval.
///
/// Intended to be raced against a shutdown signal by the caller; the loop
/// itself never returns.
pub async fn run<S: PeerSource + 'static>(reconciler: Arc<Reconciler<S>>, interval: Duration) {
    let gate = Arc::new(Mutex::new(()));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "scheduler started");
    loop {
        ticker.tick().await;

        let Ok(permit) = gate.clone().try_lock_owned() else {
            warn!("previous cycle still running; dropping this tick");
            metrics::record_tick_dropped();
            continue;
        };

        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = reconciler.run_cycle().await;
            metrics::record_cycle(&result, started.elapsed());
            debug!(elapsed = ?started.elapsed(), "cycle task finished");
            drop(permit);
        });
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
