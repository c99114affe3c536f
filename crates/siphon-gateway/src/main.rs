//! Siphon ingest gateway daemon.
//!
//! Accepts mirrored HTTP-request records over `POST /ingest`, authenticates
//! each caller against the named stream, resolves the stream to its broker
//! topic, and publishes the record for downstream replay.
//!
//! # Usage
//!
//! ```bash
//! # All settings come from the environment (optionally via .env)
//! SIPHON_DB_URL=postgres://siphon@localhost:5432/meta \
//! SIPHON_BROKER_ADDR=localhost:9092 \
//! siphon-gateway
//! ```
//!
//! # Graceful Shutdown
//!
//! The daemon handles SIGINT (Ctrl+C) and SIGTERM: in-flight requests are
//! drained, then the process exits cleanly.

use std::sync::Arc;

use anyhow::Context;
use axum::http::Request;
use clap::Parser;
use siphon_broker::{KafkaSink, MessageSink, Publisher};
use siphon_core::metrics::{init_metrics, start_metrics_server};
use siphon_gateway::auth::{CredentialVerifier, PgCredentialVerifier, StaticCredentialVerifier};
use siphon_gateway::pipeline::IngestPipeline;
use siphon_gateway::readiness::{self, PgProbe, ReadinessState, TcpProbe};
use siphon_gateway::resolve::{PgTopicResolver, TopicResolver};
use siphon_gateway::{router, store, AppState, AuthBackend, Config};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Siphon ingest gateway.
#[derive(Parser, Debug)]
#[command(name = "siphon-gateway")]
#[command(about = "HTTP ingest gateway for mirrored request streams", long_about = None)]
#[command(version)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load .env file if it exists
    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "siphon ingest gateway starting"
    );

    // Load configuration
    let config = Config::from_env()?;

    // Initialize metrics
    if config.metrics_port > 0 {
        let handle = init_metrics();
        start_metrics_server(config.metrics_port, handle).await?;
    }

    // Stream-metadata store (credentials + stream→topic bindings)
    let db = store::connect(&config.db_url).await?;

    // Broker sink shared by every request
    let sink: Arc<dyn MessageSink> = Arc::new(
        KafkaSink::connect(vec![config.broker_addr.clone()])
            .await
            .context("failed to connect to the broker")?,
    );
    let publisher = Publisher::new(sink);

    // Credential-verifier backend, fixed at startup
    let verifier: Arc<dyn CredentialVerifier> = match config.auth_backend {
        AuthBackend::Database => Arc::new(PgCredentialVerifier::new(Arc::clone(&db))),
        AuthBackend::Static => {
            let spec = config.static_credentials.as_deref().unwrap_or_default();
            Arc::new(StaticCredentialVerifier::parse(spec)?)
        }
    };
    let resolver: Arc<dyn TopicResolver> = Arc::new(PgTopicResolver::new(Arc::clone(&db)));

    // Readiness gate and its background refresh loop
    let readiness_state = ReadinessState::new();
    let refresh = readiness::spawn_refresh_loop(
        readiness_state.clone(),
        Arc::new(PgProbe::new(config.db_url.clone())),
        Arc::new(TcpProbe::new(config.broker_addr.clone())),
        config.health_interval,
    );

    let pipeline = Arc::new(IngestPipeline::new(
        readiness_state.clone(),
        verifier,
        resolver,
        publisher,
    ));
    let state = AppState::new(pipeline, readiness_state);

    // Build router with request tracing
    let app = router(state).layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        }),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining requests");
}
