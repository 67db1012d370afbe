// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Peer differ: the additive delta between authoritative and local state.

use std::collections::BTreeSet;

use crate::peer::Peer;

/// Peers present in the authoritative set but absent locally.
///
/// Pure set difference by site id, sorted; never produces removals, so any
/// peer that later disappears from the authoritative set stays configured
/// (append-only convergence, no flapping under partition). An empty result
/// short-circuits the rest of the cycle.
#[must_use]
pub fn missing_peers(authoritative: &[Peer], local: &BTreeSet<String>) -> Vec<Peer> {
    let mut missing: Vec<Peer> = authoritative
        .iter()
        .filter(|peer| !local.contains(&peer.site_id))
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
