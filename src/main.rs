// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use knotmesh::{
    catalog::CatalogClient,
    commit::ReloadOrchestrator,
    constants::{
        DEFAULT_CONFIG_PATH, DEFAULT_CONTROL_URL, DEFAULT_INTERVAL_SECS, DEFAULT_METRICS_ADDR,
        DIRECTORY_ZONE_LABEL, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    control::ServiceControl,
    metrics, reconciler::Reconciler, scheduler,
};
use tracing::{debug, error, info};

/// Catalog-driven peer reconciler for multi-site Knot DNS meshes.
#[derive(Parser, Debug)]
#[command(name = "knotmesh", version, about)]
struct Args {
    /// Catalog zone enumerating the mesh's member zones
    #[arg(long, env = "KNOTMESH_CATALOG_ZONE")]
    catalog_zone: String,

    /// Local server endpoint (IP:port) holding the catalog/directory replicas
    #[arg(long, env = "KNOTMESH_SERVER")]
    server: String,

    /// Directory zone holding per-site address records; derived from the
    /// catalog zone when omitted
    #[arg(long, env = "KNOTMESH_DIRECTORY_ZONE")]
    directory_zone: Option<String>,

    /// Path of the managed service's configuration document
    #[arg(long, env = "KNOTMESH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Base URL of the managed service's control API
    #[arg(long, env = "KNOTMESH_CONTROL_URL", default_value = DEFAULT_CONTROL_URL)]
    control_url: String,

    /// Seconds between reconciliation cycles
    #[arg(long, env = "KNOTMESH_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval_secs: u64,

    /// Bind address for the Prometheus metrics server
    #[arg(long, env = "KNOTMESH_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    metrics_addr: SocketAddr,
}

/// Derive the directory zone from the catalog zone by replacing its first
/// label: `catalog.mesh.internal` -> `directory.mesh.internal`.
fn derive_directory_zone(catalog_zone: &str) -> String {
    match catalog_zone.split_once('.') {
        Some((_, parent)) => format!("{DIRECTORY_ZONE_LABEL}.{parent}"),
        None => format!("{DIRECTORY_ZONE_LABEL}.{catalog_zone}"),
    }
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("knotmesh-reconciler")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug knotmesh ...
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json knotmesh ...
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    // Both required values have no safe default that spans environments;
    // clap exits with a usage error when either is absent.
    let args = Args::parse();

    info!("Starting knotmesh reconciler");

    let server: SocketAddr = args
        .server
        .parse()
        .with_context(|| format!("invalid local server endpoint '{}'", args.server))?;
    url::Url::parse(&knotmesh::control::build_api_url(&args.control_url))
        .with_context(|| format!("invalid control URL '{}'", args.control_url))?;

    let directory_zone = args
        .directory_zone
        .clone()
        .unwrap_or_else(|| derive_directory_zone(&args.catalog_zone));
    debug!(
        catalog_zone = %args.catalog_zone,
        directory_zone = %directory_zone,
        server = %server,
        "resolved zone configuration"
    );

    let source = CatalogClient::new(server, &args.catalog_zone, &directory_zone)
        .context("invalid catalog/directory zone name")?;
    let control = ServiceControl::new(&args.control_url).context("control client setup failed")?;
    let orchestrator = ReloadOrchestrator::new(control, args.config.clone());
    let reconciler = Arc::new(Reconciler::new(source, args.config, orchestrator));

    let interval = Duration::from_secs(args.interval_secs);
    let metrics_addr = args.metrics_addr;

    tokio::select! {
        () = scheduler::run(reconciler, interval) => {
            error!("CRITICAL: scheduler exited unexpectedly");
            anyhow::bail!("scheduler exited unexpectedly")
        }
        result = run_metrics_server(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received; exiting");
            Ok(())
        }
    }
}

async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    use axum::{routing::get, Router};

    let app = Router::new().route(METRICS_SERVER_PATH, get(|| async { metrics::render() }));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics server on {addr}"))?;
    info!(%addr, "metrics server listening");
    axum::serve(listener, app).await.context("metrics server failed")
}
