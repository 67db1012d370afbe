// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the knotmesh reconciler.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries and zone transfers
pub const DNS_PORT: u16 = 53;

/// DNS-over-QUIC port used for inter-site zone transfers
pub const XFR_PORT: u16 = 853;

/// TSIG key id shared by all mesh transfer remotes
pub const XFR_KEY_ID: &str = "xfr-key";

/// Owner-name label under which catalog member entries live (RFC 9432)
pub const CATALOG_MEMBER_LABEL: &str = "zones";

/// Reserved catalog owner label carrying the schema version, never a member
pub const CATALOG_VERSION_LABEL: &str = "version";

/// Suffix appended to a site id to form its remote id in the local config
pub const REMOTE_ID_SUFFIX: &str = "-remote";

/// First label of the derived directory zone name
pub const DIRECTORY_ZONE_LABEL: &str = "directory";

/// Number of hex characters kept from the member-zone digest for the
/// catalog owner label (fits well inside the 63-octet label limit)
pub const CATALOG_LABEL_HEX_LEN: usize = 16;

// ============================================================================
// Timeout Constants
// ============================================================================

/// Per-query timeout for directory/catalog DNS lookups
pub const QUERY_TIMEOUT_SECS: u64 = 5;

/// Timeout for managed-service control API calls (validate, reload)
pub const CONTROL_TIMEOUT_SECS: u64 = 10;

/// Overall cycle deadline; a cycle still short of the Writing stage at this
/// point aborts and retries at the next tick
pub const CYCLE_DEADLINE_SECS: u64 = 30;

// ============================================================================
// Scheduler Constants
// ============================================================================

/// Default interval between reconciliation cycles
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Managed Service Constants
// ============================================================================

/// Default path of the managed service's configuration document
pub const DEFAULT_CONFIG_PATH: &str = "/etc/knot/knot.conf";

/// Default base URL of the managed service's control API
pub const DEFAULT_CONTROL_URL: &str = "http://127.0.0.1:8080";

/// Control API path for offline configuration validation
pub const CONTROL_CHECK_PATH: &str = "/api/v1/config/check";

/// Control API path for making the persisted configuration live
pub const CONTROL_RELOAD_PATH: &str = "/api/v1/reload";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the Prometheus metrics HTTP server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9154";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
