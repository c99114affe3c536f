//! Prometheus metrics helpers for the Siphon gateway.
//!
//! Centralizes recorder installation and the metric catalog so every
//! component records against described metrics.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `gateway_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: used sparingly (outcome/reason only) to bound cardinality

use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded. Returns a
/// handle for [`start_metrics_server`].
///
/// # Panics
///
/// Panics if a recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    register_gateway_metrics();

    handle
}

/// Try to initialize the Prometheus metrics recorder.
///
/// Like [`init_metrics`] but returns `None` if a recorder is already
/// installed instead of panicking. Useful in tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Start the Prometheus metrics HTTP listener.
///
/// Serves `GET /metrics` on the given port from a background task and
/// returns immediately.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "metrics listener started");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics listener failed");
        }
    });

    Ok(())
}

/// Register descriptions for the gateway metric catalog.
///
/// Called automatically by [`init_metrics`].
fn register_gateway_metrics() {
    // =========================================================================
    // Ingest pipeline
    // =========================================================================

    describe_counter!(
        "ingest_requests_total",
        "Ingest calls by outcome (label: outcome)"
    );
    describe_histogram!(
        "ingest_request_duration_seconds",
        "End-to-end ingest pipeline latency"
    );
    describe_counter!(
        "ingest_auth_failures_total",
        "Rejected authentication attempts (label: reason)"
    );

    // =========================================================================
    // Publisher
    // =========================================================================

    describe_counter!(
        "ingest_messages_published_total",
        "Records successfully published to the broker"
    );
    describe_counter!(
        "ingest_publish_errors_total",
        "Failed broker publishes after recovery (label: reason)"
    );
    describe_counter!(
        "ingest_topics_created_total",
        "Topics auto-created by the publisher recovery path"
    );

    // =========================================================================
    // Readiness
    // =========================================================================

    describe_gauge!(
        "gateway_ready",
        "Whether the gateway is accepting ingest traffic (1=ready)"
    );
    describe_gauge!(
        "gateway_database_up",
        "Last database probe result (1=reachable)"
    );
    describe_gauge!(
        "gateway_broker_up",
        "Last broker probe result (1=reachable)"
    );
}
