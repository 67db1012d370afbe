// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the scheduler's single-flight behavior.

use super::*;
use crate::catalog::FetchOutcome;
use crate::commit::ReloadOrchestrator;
use crate::control::ServiceControl;
use crate::errors::CatalogError;
use async_trait::async_trait;

const BASELINE: &str = "\
remote:
  - id: siteA-remote

acl:
  - id: transfer-acl
    remote: [siteA-remote]

template:
  - id: secondary-template
    master: [siteA-remote]
";

/// Source that holds the cycle open long enough for ticks to pile up.
struct SlowEmptySource {
    delay: Duration,
}

#[async_trait]
impl PeerSource for SlowEmptySource {
    async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError> {
        tokio::time::sleep(self.delay).await;
        Ok(FetchOutcome {
            peers: Vec::new(),
            skipped: 0,
        })
    }
}

struct AlwaysFailingSource;

#[async_trait]
impl PeerSource for AlwaysFailingSource {
    async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError> {
        Err(CatalogError::ConnectionFailed {
            server: "10.0.0.1:53".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

async fn reconciler<S: PeerSource>(source: S) -> (Arc<Reconciler<S>>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("knot.conf");
    tokio::fs::write(&config_path, BASELINE).await.unwrap();
    // Control endpoint is never reached: these cycles stop at the empty diff
    // or at the failed fetch.
    let control = ServiceControl::new("127.0.0.1:1").unwrap();
    let orchestrator = ReloadOrchestrator::new(control, config_path.clone());
    (
        Arc::new(Reconciler::new(source, config_path, orchestrator)),
        dir,
    )
}

#[tokio::test]
async fn test_overlapping_ticks_are_dropped_not_queued() {
    let dropped_before = crate::metrics::TICKS_DROPPED_TOTAL.get();

    let (reconciler, _dir) = reconciler(SlowEmptySource {
        delay: Duration::from_millis(200),
    })
    .await;

    let _ = tokio::time::timeout(
        Duration::from_millis(450),
        run(reconciler, Duration::from_millis(50)),
    )
    .await;

    assert!(crate::metrics::TICKS_DROPPED_TOTAL.get() > dropped_before);
}

#[tokio::test]
async fn test_failing_cycles_do_not_stop_the_scheduler() {
    let errors_before = crate::metrics::CYCLES_TOTAL
        .with_label_values(&["error"])
        .get();

    let (reconciler, _dir) = reconciler(AlwaysFailingSource).await;

    let _ = tokio::time::timeout(
        Duration::from_millis(250),
        run(reconciler, Duration::from_millis(50)),
    )
    .await;

    // Several cycles ran and failed; the loop only stopped because the test
    // timed it out.
    let errors_after = crate::metrics::CYCLES_TOTAL
        .with_label_values(&["error"])
        .get();
    assert!(errors_after >= errors_before + 2.0);
}
