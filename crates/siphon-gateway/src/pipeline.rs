//! The ingest pipeline.
//!
//! One [`IngestPipeline::ingest`] call per HTTP request, running the ordered
//! steps readiness → decode → authenticate → resolve → serialize → publish
//! and short-circuiting on the first failure. The pipeline is independent of
//! axum so its contract can be exercised without an HTTP server.
//!
//! Ordering is load-bearing: authentication happens before topic resolution,
//! so by the time a topic name exists in this unit of work the caller has
//! already proven a write claim on exactly that stream. The publisher's
//! topic auto-creation relies on this.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use siphon_broker::Publisher;
use siphon_core::IngestEnvelope;

use crate::auth::{CredentialVerifier, Permission};
use crate::error::IngestError;
use crate::readiness::ReadinessState;
use crate::resolve::TopicResolver;

/// Orchestrates one ingest unit of work per request.
///
/// Holds no per-request state; concurrent calls share only the read-only
/// readiness snapshot and the internally-synchronized publisher sink.
pub struct IngestPipeline {
    readiness: ReadinessState,
    verifier: Arc<dyn CredentialVerifier>,
    resolver: Arc<dyn TopicResolver>,
    publisher: Publisher,
}

impl IngestPipeline {
    /// Wire the pipeline to its collaborators.
    pub fn new(
        readiness: ReadinessState,
        verifier: Arc<dyn CredentialVerifier>,
        resolver: Arc<dyn TopicResolver>,
        publisher: Publisher,
    ) -> Self {
        Self {
            readiness,
            verifier,
            resolver,
            publisher,
        }
    }

    /// Ingest one envelope, metering the outcome.
    pub async fn ingest(
        &self,
        envelope_bytes: &[u8],
        auth_header: Option<&str>,
    ) -> Result<(), IngestError> {
        let started = Instant::now();
        let result = self.run(envelope_bytes, auth_header).await;

        let outcome = match &result {
            Ok(()) => "accepted",
            Err(err) => err.outcome(),
        };
        counter!("ingest_requests_total", "outcome" => outcome).increment(1);
        histogram!("ingest_request_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        envelope_bytes: &[u8],
        auth_header: Option<&str>,
    ) -> Result<(), IngestError> {
        // Fail-closed before the first successful dependency check. Nothing
        // downstream is invoked while not ready.
        if !self.readiness.is_ready() {
            return Err(IngestError::Unavailable);
        }

        let envelope = IngestEnvelope::decode(envelope_bytes)
            .map_err(|e| IngestError::Validation(e.to_string()))?;

        let identity = match self
            .verifier
            .verify(auth_header, &envelope.stream_id, Permission::Write)
            .await
        {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(stream_id = %envelope.stream_id, error = %err, "authentication failed");
                counter!("ingest_auth_failures_total", "reason" => err.reason()).increment(1);
                return Err(IngestError::Auth);
            }
        };

        let binding = match self.resolver.resolve(&envelope.stream_id).await {
            Ok(binding) => binding,
            Err(err) => {
                tracing::warn!(stream_id = %envelope.stream_id, error = %err, "stream resolution failed");
                return Err(IngestError::NotFound);
            }
        };

        let value = envelope
            .request
            .to_bytes()
            .map_err(|e| IngestError::Internal(e.to_string()))?;

        tracing::debug!(
            stream_id = %envelope.stream_id,
            topic = %binding.topic,
            username = %identity.username,
            request_id = %envelope.request.request_id,
            "publishing mirrored request"
        );

        self.publisher
            .publish(&binding.topic, envelope.request.request_id.as_bytes(), &value)
            .await?;

        Ok(())
    }
}
