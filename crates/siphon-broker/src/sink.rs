//! The sink abstraction over a broker client.

use async_trait::async_trait;

use crate::error::SinkError;

/// Outcome of a topic-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCreation {
    /// The topic was created by this request.
    Created,
    /// The topic already existed, typically because a concurrent publisher
    /// won the creation race.
    AlreadyExists,
}

/// Configuration applied when the publisher auto-creates a topic.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    /// Number of partitions for new topics.
    pub partitions: i32,
    /// Replication factor for new topics.
    pub replication: i16,
    /// Broker-side timeout for the creation request, in milliseconds.
    pub create_timeout_ms: i32,
}

impl Default for TopicSpec {
    fn default() -> Self {
        Self {
            partitions: 1,
            replication: 1,
            create_timeout_ms: 5_000,
        }
    }
}

/// A thread-safe broker write client.
///
/// One sink is shared by every concurrent request; implementations must be
/// internally synchronized. Errors carry the client's text so the publisher
/// can classify them (see [`crate::classify`]).
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish one record to `topic` with the given key and value.
    async fn publish_raw(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), SinkError>;

    /// Create `topic` with the given spec.
    ///
    /// Implementations report a pre-existing topic as
    /// [`TopicCreation::AlreadyExists`] rather than an error, which makes
    /// creation idempotent under races.
    async fn create_topic(&self, topic: &str, spec: &TopicSpec)
        -> Result<TopicCreation, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topic_spec_is_minimal() {
        let spec = TopicSpec::default();
        assert_eq!(spec.partitions, 1);
        assert_eq!(spec.replication, 1);
    }
}
