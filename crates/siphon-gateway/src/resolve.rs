//! Stream-to-topic resolution.
//!
//! Broker topic names are never taken from client input: the pipeline only
//! publishes to topics returned by this trusted lookup, and only after the
//! caller's write claim on the stream has been verified.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::Client;

/// The resolved binding for one request. Looked up fresh per request, never
/// cached across requests.
#[derive(Debug, Clone)]
pub struct StreamTopicBinding {
    /// The logical stream that was resolved.
    pub stream_id: String,
    /// The broker topic backing the stream.
    pub topic: String,
    /// Owning tenant.
    pub tenant: String,
}

/// Why resolution failed. Both variants surface to callers as 404.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No stream with this name exists.
    #[error("stream '{0}' not found")]
    NotFound(String),

    /// The metadata store failed.
    #[error("resolver backend error: {0}")]
    Backend(String),
}

/// Maps a stream identifier to its authorized broker topic.
#[async_trait]
pub trait TopicResolver: Send + Sync {
    /// Resolve `stream_id` to its topic binding.
    async fn resolve(&self, stream_id: &str) -> Result<StreamTopicBinding, ResolveError>;
}

const RESOLVE_QUERY: &str = "\
    SELECT s.topic, t.name \
    FROM streams s \
    JOIN tenants t ON t.id = s.tenant_id \
    WHERE s.name = $1";

/// Resolver backed by the stream-metadata store.
pub struct PgTopicResolver {
    client: Arc<Client>,
}

impl PgTopicResolver {
    /// Create a resolver over a shared metadata-store client.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TopicResolver for PgTopicResolver {
    async fn resolve(&self, stream_id: &str) -> Result<StreamTopicBinding, ResolveError> {
        let row = self
            .client
            .query_opt(RESOLVE_QUERY, &[&stream_id])
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?
            .ok_or_else(|| ResolveError::NotFound(stream_id.to_string()))?;

        Ok(StreamTopicBinding {
            stream_id: stream_id.to_string(),
            topic: row.get(0),
            tenant: row.get(1),
        })
    }
}
