//! Application state shared by all request handlers.

use std::sync::Arc;

use crate::pipeline::IngestPipeline;
use crate::readiness::ReadinessState;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// The ingest pipeline driving `POST /ingest`.
    pub pipeline: Arc<IngestPipeline>,

    /// Readiness snapshot backing `GET /health`.
    pub readiness: ReadinessState,
}

impl AppState {
    /// Assemble the state from its wired components.
    pub fn new(pipeline: Arc<IngestPipeline>, readiness: ReadinessState) -> Self {
        Self {
            pipeline,
            readiness,
        }
    }
}
