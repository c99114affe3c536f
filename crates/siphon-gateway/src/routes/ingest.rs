//! The ingest endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};

use crate::error::IngestError;
use crate::state::AppState;

/// `POST /ingest`
///
/// Accepts one envelope (a stream identifier plus one mirrored request),
/// runs the publish pipeline, and answers `202 "OK"` once the record is in
/// the broker. Failure classes map to 400/401/404/503/500; see
/// [`IngestError`].
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), IngestError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    state.pipeline.ingest(&body, auth_header).await?;

    Ok((StatusCode::ACCEPTED, "OK"))
}
