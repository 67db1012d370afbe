// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Directory/catalog client: reads authoritative peer state over DNS.
//!
//! The client talks to the local replica endpoint only (the catalog and
//! directory zones are already synchronized onto every site by standard zone
//! transfer), so a reconciliation cycle adds no cross-site traffic and keeps
//! working under partition.
//!
//! One TCP connection per cycle: an AXFR of the catalog zone enumerates the
//! member zones (RFC 9432 layout, `<label>.zones.<catalog>  PTR <member>`),
//! then per-member A/TXT lookups against the directory zone resolve each
//! site's transfer target. Every record is treated defensively: malformed or
//! unmatched entries are skipped with a warning, never failing the cycle.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_client::tcp::TcpClientStream;
use hickory_proto::iocompat::AsyncIoTokioAsStd;
use hickory_proto::op::ResponseCode;
use tokio::net::TcpStream as TokioTcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::constants::{CATALOG_MEMBER_LABEL, CATALOG_VERSION_LABEL, QUERY_TIMEOUT_SECS};
use crate::errors::CatalogError;
use crate::peer::{catalog_label, DirectoryRecord, Peer};

/// Result of one authoritative fetch.
///
/// `skipped` counts catalog/directory entries that were malformed or not yet
/// propagated; the cycle reports one `MalformedRecord` per skip but proceeds
/// with the entries that parsed cleanly.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Deduplicated peers, sorted by site id
    pub peers: Vec<Peer>,
    /// Number of entries skipped with a warning
    pub skipped: usize,
}

/// Read-only client for the directory and catalog zones.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    server: SocketAddr,
    catalog_zone: Name,
    directory_zone: Name,
}

impl CatalogClient {
    /// Create a client for the given local replica endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if either zone name is not a valid DNS name.
    pub fn new(
        server: SocketAddr,
        catalog_zone: &str,
        directory_zone: &str,
    ) -> Result<Self, CatalogError> {
        let catalog_zone =
            Name::from_str(catalog_zone).map_err(|e| CatalogError::InvalidZoneName {
                zone: catalog_zone.to_string(),
                reason: e.to_string(),
            })?;
        let directory_zone =
            Name::from_str(directory_zone).map_err(|e| CatalogError::InvalidZoneName {
                zone: directory_zone.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            server,
            catalog_zone,
            directory_zone,
        })
    }

    /// Fetch the authoritative peer set from the local replica.
    ///
    /// # Errors
    ///
    /// Returns a transient [`CatalogError`] when the endpoint is unreachable,
    /// a query times out, or the catalog transfer fails; the caller aborts
    /// the cycle without mutating local state.
    pub async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError> {
        let query_timeout = Duration::from_secs(QUERY_TIMEOUT_SECS);

        let (stream, sender) =
            TcpClientStream::<AsyncIoTokioAsStd<TokioTcpStream>>::new(self.server);
        let connect = AsyncClient::new(stream, sender, None);
        let (mut client, bg) = timeout(query_timeout, connect)
            .await
            .map_err(|_| CatalogError::QueryTimeout {
                name: self.catalog_zone.to_utf8(),
                server: self.server.to_string(),
                timeout_secs: QUERY_TIMEOUT_SECS,
            })?
            .map_err(|e| CatalogError::ConnectionFailed {
                server: self.server.to_string(),
                reason: e.to_string(),
            })?;
        tokio::spawn(bg);

        // Enumerate member zones from the catalog replica.
        let response = self
            .query(&mut client, self.catalog_zone.clone(), RecordType::AXFR)
            .await?;
        if response.response_code() != ResponseCode::NoError {
            return Err(CatalogError::QueryFailed {
                name: self.catalog_zone.to_utf8(),
                server: self.server.to_string(),
                reason: response.response_code().to_string(),
            });
        }

        let (members, mut skipped) = parse_catalog_members(&self.catalog_zone, response.answers());
        debug!(
            members = members.len(),
            skipped, "catalog transfer parsed"
        );

        let mut peers: Vec<Peer> = Vec::with_capacity(members.len());
        for member in members {
            let Some(site_id) = site_id_of(&member) else {
                warn!(zone = %member, "catalog member zone has no usable site label; skipping");
                skipped += 1;
                continue;
            };
            let site_id = site_id.to_string();

            let owner = match Name::from_str(&site_id).and_then(|n| n.append_domain(&self.directory_zone)) {
                Ok(owner) => owner,
                Err(e) => {
                    warn!(zone = %member, error = %e, "cannot form directory owner name; skipping");
                    skipped += 1;
                    continue;
                }
            };

            let a_response = self.query(&mut client, owner.clone(), RecordType::A).await?;
            let txt_response = self.query(&mut client, owner.clone(), RecordType::TXT).await?;
            let record = parse_directory_answers(
                &member,
                a_response.answers(),
                txt_response.answers(),
            );

            match record.target() {
                Some(target) => peers.push(Peer {
                    site_id,
                    address: target.to_string(),
                    zone: member,
                }),
                None => {
                    // Expected transiently while a new member's directory
                    // records are still propagating.
                    warn!(zone = %member, "no directory record for catalog member; skipping");
                    skipped += 1;
                }
            }
        }

        peers.sort();
        peers.dedup();
        Ok(FetchOutcome { peers, skipped })
    }

    async fn query(
        &self,
        client: &mut AsyncClient,
        name: Name,
        record_type: RecordType,
    ) -> Result<hickory_proto::xfer::DnsResponse, CatalogError> {
        let display = name.to_utf8();
        let response = timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            client.query(name, DNSClass::IN, record_type),
        )
        .await
        .map_err(|_| CatalogError::QueryTimeout {
            name: display.clone(),
            server: self.server.to_string(),
            timeout_secs: QUERY_TIMEOUT_SECS,
        })?
        .map_err(|e| CatalogError::QueryFailed {
            name: display.clone(),
            server: self.server.to_string(),
            reason: e.to_string(),
        })?;

        // NXDOMAIN on a per-site lookup means the directory record has not
        // propagated yet; the caller skips that member. SERVFAIL and friends
        // abort the cycle.
        match response.response_code() {
            ResponseCode::NoError | ResponseCode::NXDomain => Ok(response),
            code => Err(CatalogError::QueryFailed {
                name: display,
                server: self.server.to_string(),
                reason: code.to_string(),
            }),
        }
    }
}

/// Extract member zone names from a catalog zone transfer.
///
/// Returns the deduplicated, sorted member zone names plus the number of
/// entries skipped as malformed. Only PTR records directly under
/// `zones.<catalog>` count; the owner label must match the one-way digest of
/// the PTR payload (label/payload mismatch is treated as corruption of the
/// entry, not of the zone).
pub(crate) fn parse_catalog_members(catalog: &Name, answers: &[Record]) -> (Vec<String>, usize) {
    let mut skipped = 0usize;
    let member_suffix = match Name::from_str(CATALOG_MEMBER_LABEL)
        .and_then(|n| n.append_domain(catalog))
    {
        Ok(suffix) => suffix,
        Err(_) => return (Vec::new(), 0),
    };

    let mut members: Vec<String> = Vec::new();
    for record in answers {
        if record.record_type() != RecordType::PTR {
            continue;
        }
        let owner = record.name();
        if !member_suffix.zone_of(owner) || owner.num_labels() != member_suffix.num_labels() + 1 {
            warn!(owner = %owner, "PTR record outside the catalog member namespace; skipping");
            skipped += 1;
            continue;
        }

        let label = owner
            .iter()
            .next()
            .map(|l| String::from_utf8_lossy(l).to_string())
            .unwrap_or_default();
        if label == CATALOG_VERSION_LABEL {
            continue;
        }

        let Some(RData::PTR(ptr)) = record.data() else {
            warn!(owner = %owner, "catalog entry missing PTR payload; skipping");
            skipped += 1;
            continue;
        };
        let member = ptr.0.to_utf8();
        let member = member.trim_end_matches('.').to_string();
        if member.is_empty() {
            warn!(owner = %owner, "catalog entry has empty member zone; skipping");
            skipped += 1;
            continue;
        }

        // The label is never inverted; it is only checked against the digest
        // of the payload it claims to name.
        if label != catalog_label(&member) {
            warn!(
                owner = %owner,
                member = %member,
                "catalog label does not match member digest; skipping"
            );
            skipped += 1;
            continue;
        }

        members.push(member);
    }

    members.sort();
    members.dedup();
    (members, skipped)
}

/// Assemble a [`DirectoryRecord`] from directory A and TXT answers.
///
/// The first A record supplies the address; the first TXT record that parses
/// as a DNS name supplies the server FQDN. An unparsable TXT payload is
/// ignored (the A address still serves as the target).
pub(crate) fn parse_directory_answers(
    zone: &str,
    a_answers: &[Record],
    txt_answers: &[Record],
) -> DirectoryRecord {
    let address = a_answers.iter().find_map(|record| match record.data() {
        Some(RData::A(a)) => Some(a.to_string()),
        _ => None,
    });

    let server_fqdn = txt_answers.iter().find_map(|record| {
        let Some(RData::TXT(txt)) = record.data() else {
            return None;
        };
        let joined: String = txt
            .txt_data()
            .iter()
            .map(|part| String::from_utf8_lossy(part))
            .collect();
        let candidate = joined.trim().to_string();
        match Name::from_str(&candidate) {
            Ok(_) if !candidate.is_empty() => Some(candidate.trim_end_matches('.').to_string()),
            _ => {
                warn!(zone = %zone, payload = %joined, "unparsable server FQDN in directory TXT record");
                None
            }
        }
    });

    DirectoryRecord {
        zone: zone.to_string(),
        address,
        server_fqdn,
    }
}

/// The site id of a member zone: its first label.
pub(crate) fn site_id_of(member_zone: &str) -> Option<&str> {
    member_zone.split('.').next().filter(|label| !label.is_empty())
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod catalog_tests;
