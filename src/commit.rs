// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reload orchestrator: validate, write atomically, reload, roll back.
//!
//! State machine per candidate: `Validating -> Writing -> Reloading ->
//! {Committed | RolledBack}`. Nothing is persisted before validation passes;
//! once Writing has begun the machine always runs to a terminal state, so
//! partial application is impossible. No-op cycles never reach this module.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::LocalConfig;
use crate::control::ServiceControl;
use crate::errors::{CommitError, ControlError};

/// Applies a validated candidate configuration to the managed service.
#[derive(Debug, Clone)]
pub struct ReloadOrchestrator {
    control: ServiceControl,
    config_path: PathBuf,
}

impl ReloadOrchestrator {
    /// Create an orchestrator for the given control client and config path.
    #[must_use]
    pub fn new(control: ServiceControl, config_path: PathBuf) -> Self {
        Self {
            control,
            config_path,
        }
    }

    /// Validate, persist and activate `candidate`, rolling back to
    /// `previous` if the service rejects the reload.
    ///
    /// # Errors
    ///
    /// - [`CommitError::Validation`] — checker rejected the candidate or was
    ///   unreachable; nothing was written.
    /// - [`CommitError::Reload`] — the service rejected the reload after a
    ///   successful write; the previous document was restored and
    ///   re-signaled.
    /// - [`CommitError::Write`] — filesystem failure while persisting.
    pub async fn commit(
        &self,
        previous: &LocalConfig,
        candidate: &LocalConfig,
    ) -> Result<(), CommitError> {
        // Validating: nothing durable is touched until the checker agrees.
        self.control
            .validate_config(candidate.text())
            .await
            .map_err(CommitError::Validation)?;

        // Writing: write-new-then-rename, never edit-in-place.
        candidate.persist(&self.config_path).await?;
        info!(
            path = %self.config_path.display(),
            digest = %candidate.digest(),
            "candidate configuration written"
        );

        // Reloading.
        match self.control.reload().await {
            Ok(()) => {
                info!("service reloaded with new configuration");
                Ok(())
            }
            Err(reload_err) => {
                error!(error = %reload_err, "reload rejected after write; rolling back");
                self.rollback(previous).await;
                Err(CommitError::Reload(reload_err))
            }
        }
    }

    /// Restore the previous document and re-signal a reload with the old
    /// content. Best effort: a site that cannot even roll back keeps serving
    /// whatever the running process already has loaded.
    async fn rollback(&self, previous: &LocalConfig) {
        if let Err(e) = previous.persist(&self.config_path).await {
            error!(error = %e, "rollback write failed; persisted config out of sync with running service");
            return;
        }
        match self.control.reload().await {
            Ok(()) => info!("rolled back to previous configuration"),
            Err(e @ ControlError::Unreachable { .. }) => {
                warn!(error = %e, "rollback reload could not reach the service");
            }
            Err(e) => error!(error = %e, "rollback reload rejected"),
        }
    }
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod commit_tests;
