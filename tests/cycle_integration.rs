// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end reconciliation cycle tests: fixed authoritative peer set,
//! real configuration file on disk, mock control API.

mod common;

use common::{peer, setup_reconciler, FixedSource, BASELINE};
use knotmesh::errors::ErrorKind;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_control(server: &MockServer, check_status: u16, reload_status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/v1/config/check"))
        .respond_with(ResponseTemplate::new(check_status))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reload"))
        .respond_with(ResponseTemplate::new(reload_status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn two_site_mesh_converges_in_one_cycle() {
    let server = MockServer::start().await;
    mount_control(&server, 200, 200).await;

    let source = FixedSource {
        peers: vec![
            peer("siteA", "10.0.0.1"),
            peer("siteB", "10.0.0.2"),
        ],
        skipped: 0,
    };
    let (reconciler, config_path, _dir) = setup_reconciler(source, &server).await;

    let result = reconciler.run_cycle().await;
    assert!(!result.unchanged);
    assert!(result.errors.is_empty());
    assert_eq!(result.added.len(), 1);
    assert_eq!(result.added[0].site_id, "siteB");

    let on_disk = tokio::fs::read_to_string(&config_path).await.unwrap();
    assert!(on_disk.contains("- id: siteA-remote"));
    assert!(on_disk.contains("- id: siteB-remote"));
    assert!(on_disk.contains("    address: 10.0.0.2@853"));
    assert!(on_disk.contains("remote: [siteA-remote, siteB-remote]"));
    assert!(on_disk.contains("master: [siteA-remote, siteB-remote]"));
    // Manually maintained sections survive the merge untouched.
    assert!(on_disk.contains("server:\n    listen: 0.0.0.0@53"));
    assert!(on_disk.contains("storage: /var/lib/knot"));
}

#[tokio::test]
async fn repeated_cycles_are_idempotent() {
    let server = MockServer::start().await;
    mount_control(&server, 200, 200).await;

    let source = FixedSource {
        peers: vec![
            peer("siteA", "10.0.0.1"),
            peer("siteB", "10.0.0.2"),
        ],
        skipped: 0,
    };
    let (reconciler, config_path, _dir) = setup_reconciler(source, &server).await;

    let first = reconciler.run_cycle().await;
    assert!(!first.unchanged);
    let after_first = tokio::fs::read_to_string(&config_path).await.unwrap();

    let second = reconciler.run_cycle().await;
    assert!(second.unchanged);
    assert!(second.added.is_empty());
    assert!(second.errors.is_empty());

    let after_second = tokio::fs::read_to_string(&config_path).await.unwrap();
    assert_eq!(after_first, after_second);

    // One validate and one reload in total: the no-op cycle never touched
    // the control API.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn peers_are_never_removed_by_later_cycles() {
    let server = MockServer::start().await;
    mount_control(&server, 200, 200).await;

    // Authoritative set no longer lists siteA, which is configured locally.
    let source = FixedSource {
        peers: vec![peer("siteB", "10.0.0.2")],
        skipped: 0,
    };
    let (reconciler, config_path, _dir) = setup_reconciler(source, &server).await;

    let result = reconciler.run_cycle().await;
    assert_eq!(result.added.len(), 1);
    assert_eq!(result.added[0].site_id, "siteB");

    let on_disk = tokio::fs::read_to_string(&config_path).await.unwrap();
    assert!(on_disk.contains("- id: siteA-remote"));
    assert!(on_disk.contains("- id: siteB-remote"));
}

#[tokio::test]
async fn reload_rejection_restores_previous_document() {
    let server = MockServer::start().await;
    mount_control(&server, 200, 500).await;

    let source = FixedSource {
        peers: vec![
            peer("siteA", "10.0.0.1"),
            peer("siteB", "10.0.0.2"),
        ],
        skipped: 0,
    };
    let (reconciler, config_path, _dir) = setup_reconciler(source, &server).await;

    let result = reconciler.run_cycle().await;
    assert!(result.unchanged);
    assert_eq!(result.errors, vec![ErrorKind::ReloadFailed]);

    // Rolled back: pre-cycle document, and a reload was re-signaled with it.
    let on_disk = tokio::fs::read_to_string(&config_path).await.unwrap();
    assert_eq!(on_disk, BASELINE);

    let reloads = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/v1/reload")
        .count();
    assert_eq!(reloads, 2);
}

#[tokio::test]
async fn malformed_entries_are_reported_but_do_not_block_convergence() {
    let server = MockServer::start().await;
    mount_control(&server, 200, 200).await;

    let source = FixedSource {
        peers: vec![
            peer("siteA", "10.0.0.1"),
            peer("siteB", "10.0.0.2"),
        ],
        skipped: 1,
    };
    let (reconciler, config_path, _dir) = setup_reconciler(source, &server).await;

    let result = reconciler.run_cycle().await;
    assert!(!result.unchanged);
    assert_eq!(result.added.len(), 1);
    assert_eq!(result.errors, vec![ErrorKind::MalformedRecord]);

    let on_disk = tokio::fs::read_to_string(&config_path).await.unwrap();
    assert!(on_disk.contains("- id: siteB-remote"));
}
