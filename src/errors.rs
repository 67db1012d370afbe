// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the knotmesh reconciler.
//!
//! This module provides specialized error types for:
//! - Directory/catalog DNS queries (hickory client)
//! - Local configuration parsing and mutation
//! - The managed service's control API (validate, reload)
//! - The commit state machine (write, reload, rollback)
//!
//! Every error maps onto a small [`ErrorKind`] taxonomy that drives logging
//! severity, metrics labels and the per-cycle result.

use serde::Serialize;
use thiserror::Error;

/// Classification of a reconciliation error.
///
/// The kind decides how a cycle reacts: `Transient` errors are retried at the
/// next scheduled tick with no state change; everything else is surfaced to
/// the operator because it indicates data corruption or an environment
/// problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Query timeout or unreachable server; retry next cycle, no state change
    Transient,
    /// A single directory/catalog entry was malformed and skipped
    MalformedRecord,
    /// The local configuration baseline is unusable; cycle aborted
    Fatal,
    /// Candidate configuration failed validation; nothing was written
    InvalidConfig,
    /// Service rejected the reload after a successful write; file rolled back
    ReloadFailed,
}

impl ErrorKind {
    /// Stable lowercase label used for metrics and structured logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::MalformedRecord => "malformed_record",
            Self::Fatal => "fatal",
            Self::InvalidConfig => "invalid_config",
            Self::ReloadFailed => "reload_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from directory/catalog DNS queries.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// Connection to the local replica endpoint could not be established
    #[error("DNS connection to {server} failed: {reason}")]
    ConnectionFailed {
        /// The DNS server (IP:port) that couldn't be reached
        server: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// A query exceeded the per-query timeout
    #[error("DNS query for '{name}' on {server} timed out after {timeout_secs}s")]
    QueryTimeout {
        /// The owner name that was queried
        name: String,
        /// The DNS server that was queried
        server: String,
        /// Timeout in seconds
        timeout_secs: u64,
    },

    /// The query itself failed (transport error, SERVFAIL, zone not loaded)
    #[error("DNS query for '{name}' on {server} failed: {reason}")]
    QueryFailed {
        /// The owner name that was queried
        name: String,
        /// The DNS server that was queried
        server: String,
        /// Response code or transport error
        reason: String,
    },

    /// The configured catalog zone name is not a valid DNS name
    #[error("Invalid zone name '{zone}': {reason}")]
    InvalidZoneName {
        /// The offending zone name
        zone: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors from reading or mutating the local configuration document.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// The configuration file could not be read or written
    #[error("Configuration file {path} inaccessible: {reason}")]
    Io {
        /// Path of the configuration file
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// The document lacks the structure the merge needs (no `remote:` section)
    #[error("Configuration at {path} is unparsable: {reason}")]
    Unparsable {
        /// Path of the configuration file
        path: String,
        /// What was missing or malformed
        reason: String,
    },
}

/// Errors from the managed service's control API.
#[derive(Error, Debug, Clone)]
pub enum ControlError {
    /// The control endpoint could not be reached or timed out
    #[error("Control API at {endpoint} unreachable: {reason}")]
    Unreachable {
        /// The control endpoint base URL
        endpoint: String,
        /// Reason for the failure
        reason: String,
    },

    /// The candidate document failed the service's syntax/semantic check
    #[error("Candidate configuration rejected by {endpoint}: {diagnostic}")]
    ValidationRejected {
        /// The control endpoint base URL
        endpoint: String,
        /// Diagnostic returned by the checker
        diagnostic: String,
    },

    /// The service refused to reload even though validation passed
    #[error("Reload rejected by {endpoint}: {diagnostic}")]
    ReloadRejected {
        /// The control endpoint base URL
        endpoint: String,
        /// Diagnostic returned by the service
        diagnostic: String,
    },

    /// The control API returned a status the client does not understand
    #[error("Unexpected control API response from {endpoint}: {status} {body}")]
    UnexpectedResponse {
        /// The control endpoint base URL
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body or error message
        body: String,
    },
}

/// Errors from the commit state machine (Validating -> Writing -> Reloading).
///
/// The phase matters: a control failure during validation happens before
/// anything is persisted, while a failure during reload happens after the
/// write and triggers rollback.
#[derive(Error, Debug, Clone)]
pub enum CommitError {
    /// Control API failure during the Validating stage; nothing written
    #[error("validation stage: {0}")]
    Validation(#[source] ControlError),

    /// Control API failure during the Reloading stage; file rolled back
    #[error("reload stage: {0}")]
    Reload(#[source] ControlError),

    /// Writing the candidate (or restoring the previous document) failed
    #[error(transparent)]
    Write(#[from] ConfigError),
}

/// Composite error type covering one reconciliation cycle.
#[derive(Error, Debug, Clone)]
pub enum ReconcileError {
    /// Directory/catalog fetch failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Local configuration could not be read or merged
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The commit state machine failed
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The cycle exceeded its overall deadline before the Writing stage
    #[error("Cycle exceeded {deadline_secs}s deadline before writing; aborted")]
    DeadlineExceeded {
        /// The configured deadline in seconds
        deadline_secs: u64,
    },
}

impl ReconcileError {
    /// Map this error onto the cycle-level taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Catalog(_) | Self::DeadlineExceeded { .. } => ErrorKind::Transient,
            Self::Config(_) => ErrorKind::Fatal,
            Self::Commit(CommitError::Validation(ControlError::ValidationRejected {
                ..
            })) => ErrorKind::InvalidConfig,
            // Validate-stage transport failures happen before anything is
            // written, so the next tick can simply retry.
            Self::Commit(CommitError::Validation(_)) => ErrorKind::Transient,
            Self::Commit(CommitError::Reload(_)) => ErrorKind::ReloadFailed,
            Self::Commit(CommitError::Write(_)) => ErrorKind::Fatal,
        }
    }

    /// Returns true if this error is expected under partition and the cycle
    /// should simply be retried at the next scheduled tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
