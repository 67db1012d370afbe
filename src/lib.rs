// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Knotmesh - catalog-driven peer reconciler for multi-site DNS meshes
//!
//! Knotmesh keeps every site in a multi-site DNS mesh aware of every other
//! site. It periodically reads the authoritative directory and catalog zones
//! (through the replica already synchronized onto the local server), computes
//! the set of peers missing from the site's Knot-style configuration, merges
//! them in with a byte-preserving structural edit, and validates, atomically
//! writes and reloads the result - rolling back if the running service
//! rejects it.
//!
//! Convergence is additive and eventual: a peer, once observed, is never
//! removed by the reconciler, and a site under partition keeps serving its
//! last-known-good configuration indefinitely.
//!
//! ## Modules
//!
//! - [`catalog`] - directory/catalog DNS client (authoritative peer set)
//! - [`config`] - local configuration reader and structural mutator
//! - [`diff`] - additive peer diffing
//! - [`control`] - managed-service control API client (validate, reload)
//! - [`commit`] - validate/write/reload state machine with rollback
//! - [`reconciler`] - one reconciliation cycle
//! - [`scheduler`] - periodic single-flight invocation
//! - [`errors`] - error taxonomy
//! - [`peer`] - core data model
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use knotmesh::peer::{catalog_label, Peer};
//!
//! let peer = Peer {
//!     site_id: "siteA".to_string(),
//!     address: "ns1.siteA.dns.internal".to_string(),
//!     zone: "siteA.mesh.internal".to_string(),
//! };
//!
//! assert_eq!(peer.remote_id(), "siteA-remote");
//! // Opaque owner label for the catalog entry of this peer's zone.
//! let label = catalog_label(&peer.zone);
//! assert_eq!(label.len(), 16);
//! ```

pub mod catalog;
pub mod commit;
pub mod config;
pub mod constants;
pub mod control;
pub mod diff;
pub mod errors;
pub mod metrics;
pub mod peer;
pub mod reconciler;
pub mod scheduler;
