//! Gateway route definitions.

mod health;
mod ingest;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the gateway router.
///
/// # Route Structure
///
/// - `POST /ingest` - authenticated ingest; other methods answer 405
/// - `GET /health` - readiness-gated health document
///
/// The Prometheus `/metrics` endpoint is served by the dedicated metrics
/// listener, not this router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest::ingest))
        .route("/health", get(health::health))
        .with_state(state)
}
