// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! One reconciliation cycle: read, diff, mutate, commit.
//!
//! The cycle is a bounded sequential pipeline; every step waits for the
//! previous one, and nothing durable changes until the reload orchestrator
//! takes over. All errors are handled here; none propagate to the scheduler.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogClient, FetchOutcome};
use crate::commit::ReloadOrchestrator;
use crate::config::LocalConfig;
use crate::constants::CYCLE_DEADLINE_SECS;
use crate::diff::missing_peers;
use crate::errors::{CatalogError, ErrorKind, ReconcileError};
use crate::peer::ReconciliationResult;

/// Source of authoritative peer state.
///
/// The production implementation is [`CatalogClient`]; tests substitute a
/// stub so a cycle can run without a DNS server.
#[async_trait]
pub trait PeerSource: Send + Sync {
    /// Fetch the deduplicated, sorted authoritative peer set.
    async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError>;
}

#[async_trait]
impl PeerSource for CatalogClient {
    async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError> {
        CatalogClient::fetch_authoritative_peers(self).await
    }
}

/// Drives one site's configuration toward authoritative state.
pub struct Reconciler<S: PeerSource> {
    source: S,
    config_path: PathBuf,
    orchestrator: ReloadOrchestrator,
    deadline: Duration,
}

impl<S: PeerSource> Reconciler<S> {
    /// Create a reconciler over the given peer source and config path.
    #[must_use]
    pub fn new(source: S, config_path: PathBuf, orchestrator: ReloadOrchestrator) -> Self {
        Self {
            source,
            config_path,
            orchestrator,
            deadline: Duration::from_secs(CYCLE_DEADLINE_SECS),
        }
    }

    /// Override the cycle deadline (tests).
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run one full cycle and report the outcome.
    ///
    /// Never panics and never returns an error: failures are folded into the
    /// result, logged at a severity matching their kind, and retried (or
    /// not) by future ticks.
    pub async fn run_cycle(&self) -> ReconciliationResult {
        let result = match self.try_cycle().await {
            Ok(result) => result,
            Err(e) => {
                let kind = e.kind();
                if e.is_transient() {
                    warn!(error = %e, kind = %kind, "cycle aborted; will retry next tick");
                } else {
                    error!(error = %e, kind = %kind, "cycle failed; operator attention needed");
                }
                ReconciliationResult::unchanged(vec![kind])
            }
        };

        match serde_json::to_string(&result) {
            Ok(json) => info!(result = %json, "reconciliation cycle finished"),
            Err(e) => warn!(error = %e, "could not serialize cycle result"),
        }
        result
    }

    async fn try_cycle(&self) -> Result<ReconciliationResult, ReconcileError> {
        let started = Instant::now();

        // Read authoritative and local state.
        let FetchOutcome { peers, skipped } = self.source.fetch_authoritative_peers().await?;
        let current = LocalConfig::load(&self.config_path).await?;
        let local_ids = current.peer_ids()?;

        let mut errors: Vec<ErrorKind> = Vec::new();
        errors.extend(std::iter::repeat_n(ErrorKind::MalformedRecord, skipped));

        // Diff; the empty delta is the common case and stays side-effect-free.
        let added = missing_peers(&peers, &local_ids);
        if added.is_empty() {
            debug!(
                authoritative = peers.len(),
                local = local_ids.len(),
                "configuration already converged"
            );
            return Ok(ReconciliationResult::unchanged(errors));
        }

        info!(
            added = added.len(),
            sites = ?added.iter().map(|p| p.site_id.as_str()).collect::<Vec<_>>(),
            "configuration is stale; merging missing peers"
        );

        // Mutate: a strict superset of the current document.
        let candidate = current.with_peers(&added)?;

        // The deadline is only enforced up to here; once the orchestrator
        // starts writing, the cycle runs to a terminal state.
        if started.elapsed() >= self.deadline {
            return Err(ReconcileError::DeadlineExceeded {
                deadline_secs: self.deadline.as_secs(),
            });
        }

        self.orchestrator.commit(&current, &candidate).await?;
        Ok(ReconciliationResult::committed(added, errors))
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
