//! Error types for broker publishing.

use thiserror::Error;

/// An error reported by a concrete sink operation.
///
/// Carries the broker client's error text verbatim so the publisher's
/// classification heuristics (see [`crate::classify`]) can inspect it.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    /// Wrap broker-reported error text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Final publish outcome after the recovery path has run.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The initial publish failed for a reason other than a missing topic.
    #[error("publish to topic '{topic}' failed: {source}")]
    Write {
        /// Target topic.
        topic: String,
        /// Broker-reported cause.
        source: SinkError,
    },

    /// The topic was missing and creating it failed.
    #[error("topic '{topic}' not found and creation failed: {source}")]
    TopicCreation {
        /// Target topic.
        topic: String,
        /// Broker-reported cause.
        source: SinkError,
    },

    /// The single post-creation retry failed.
    #[error("publish to topic '{topic}' failed after topic creation: {source}")]
    RetryFailed {
        /// Target topic.
        topic: String,
        /// Broker-reported cause.
        source: SinkError,
    },
}
