// Common test utilities for integration tests

use async_trait::async_trait;
use knotmesh::catalog::FetchOutcome;
use knotmesh::commit::ReloadOrchestrator;
use knotmesh::control::ServiceControl;
use knotmesh::errors::CatalogError;
use knotmesh::peer::Peer;
use knotmesh::reconciler::{PeerSource, Reconciler};
use std::path::PathBuf;
use wiremock::MockServer;

/// A realistic single-peer baseline document for a secondary site.
pub const BASELINE: &str = "\
server:
    listen: 0.0.0.0@53

key:
  - id: xfr-key
    algorithm: hmac-sha256
    secret: c2VjcmV0Cg==

remote:
  - id: siteA-remote
    address: ns1.siteA.dns.internal@853
    key: xfr-key
    quic: on

acl:
  - id: transfer-acl
    key: xfr-key
    action: transfer
    remote: [siteA-remote]

template:
  - id: secondary-template
    storage: /var/lib/knot
    master: [siteA-remote]

zone:
  - domain: siteA.mesh.internal
    template: secondary-template
";

/// Peer source backed by a fixed answer, standing in for the catalog client.
pub struct FixedSource {
    pub peers: Vec<Peer>,
    pub skipped: usize,
}

#[async_trait]
impl PeerSource for FixedSource {
    async fn fetch_authoritative_peers(&self) -> Result<FetchOutcome, CatalogError> {
        Ok(FetchOutcome {
            peers: self.peers.clone(),
            skipped: self.skipped,
        })
    }
}

pub fn peer(site_id: &str, address: &str) -> Peer {
    Peer {
        site_id: site_id.to_string(),
        address: address.to_string(),
        zone: format!("{site_id}.mesh.internal"),
    }
}

/// Write the baseline into a temp dir and wire a reconciler against the
/// given mock control server.
pub async fn setup_reconciler(
    source: FixedSource,
    server: &MockServer,
) -> (Reconciler<FixedSource>, PathBuf, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("knot.conf");
    tokio::fs::write(&config_path, BASELINE).await.unwrap();

    let control = ServiceControl::new(&server.uri()).unwrap();
    let orchestrator = ReloadOrchestrator::new(control, config_path.clone());
    let reconciler = Reconciler::new(source, config_path.clone(), orchestrator);
    (reconciler, config_path, dir)
}
