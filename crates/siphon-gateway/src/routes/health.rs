//! Health and readiness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Health document reflecting the latest dependency snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database_ok: bool,
    broker_ok: bool,
    /// `None` until the first background check has run.
    checked_at: Option<DateTime<Utc>>,
}

/// `GET /health`
///
/// Returns 200 while both dependencies are reachable, 503 otherwise
/// (including before the first check; the gate fails closed). Suitable as a
/// load-balancer readiness probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.readiness.snapshot();
    let ready = snapshot.is_ready();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "unavailable" },
            version: env!("CARGO_PKG_VERSION"),
            database_ok: snapshot.database_ok,
            broker_ok: snapshot.broker_ok,
            checked_at: snapshot.checked_at,
        }),
    )
}
