// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Core data model for mesh peers and reconciliation results.
//!
//! A [`Peer`] is another site in the mesh, identified by its unique site id
//! (equivalently its member zone name). Peers are immutable once observed:
//! the reconciler only ever adds them to the local configuration, never
//! updates or removes them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::constants::{CATALOG_LABEL_HEX_LEN, REMOTE_ID_SUFFIX};
use crate::errors::ErrorKind;

/// Another site in the mesh.
///
/// Ordering and equality are by `site_id`, which makes diffing and merge
/// insertion order deterministic regardless of query-result order.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    /// Unique site identifier (first label of the member zone name)
    pub site_id: String,
    /// FQDN (preferred) or address at which the site's server is reachable
    pub address: String,
    /// The site's member zone name, globally unique across the mesh
    pub zone: String,
}

impl Peer {
    /// The remote id this peer uses in the local configuration document.
    #[must_use]
    pub fn remote_id(&self) -> String {
        format!("{}{REMOTE_ID_SUFFIX}", self.site_id)
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.site_id == other.site_id
    }
}

impl Eq for Peer {}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.site_id.cmp(&other.site_id)
    }
}

/// Address mapping for a site, read from the directory zone.
///
/// The A record supplies the address; the optional TXT record supplies the
/// server FQDN, which is preferred as the transfer target when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// The member zone this record describes
    pub zone: String,
    /// Address from the directory A record
    pub address: Option<String>,
    /// Server FQDN from the directory TXT record
    pub server_fqdn: Option<String>,
}

impl DirectoryRecord {
    /// The transfer target for this site: the TXT FQDN when present,
    /// otherwise the A address.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.server_fqdn.as_deref().or(self.address.as_deref())
    }
}

/// Compute the opaque catalog owner label for a member zone name.
///
/// The label is a one-way digest used only for uniqueness of the owner name;
/// the plain zone name is always carried in the entry's PTR payload and is
/// never recovered from the label. The same digest lets the client verify
/// that an entry's label matches its payload.
#[must_use]
pub fn catalog_label(member_zone: &str) -> String {
    let canonical = member_zone.trim_end_matches('.').to_ascii_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..CATALOG_LABEL_HEX_LEN].to_string()
}

/// Outcome of one reconciliation cycle, serialized into the structured log.
///
/// Not persisted; each cycle re-derives everything from durable state.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    /// Peers merged into the local configuration this cycle, sorted by site id
    pub added: Vec<Peer>,
    /// True when the cycle was a no-op (empty diff or aborted before mutation)
    pub unchanged: bool,
    /// Error kinds observed this cycle, including per-entry skips
    pub errors: Vec<ErrorKind>,
    /// When the cycle finished
    pub completed_at: DateTime<Utc>,
}

impl ReconciliationResult {
    /// A no-op result with the given (possibly empty) error list.
    #[must_use]
    pub fn unchanged(errors: Vec<ErrorKind>) -> Self {
        Self {
            added: Vec::new(),
            unchanged: true,
            errors,
            completed_at: Utc::now(),
        }
    }

    /// A successful result that committed the given peers.
    #[must_use]
    pub fn committed(added: Vec<Peer>, errors: Vec<ErrorKind>) -> Self {
        Self {
            added,
            unchanged: false,
            errors,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod peer_tests;
