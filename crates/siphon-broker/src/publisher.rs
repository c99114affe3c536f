//! Publish-with-recovery.
//!
//! The publisher makes one direct publish attempt. If the failure is
//! classified as a missing topic it creates the topic (tolerating a lost
//! creation race) and retries exactly once; any other failure, or a failure
//! after the retry, is final. Backoff and client-level retries are the
//! broker client's concern, not this layer's.

use std::sync::Arc;

use metrics::counter;

use crate::classify;
use crate::error::PublishError;
use crate::sink::{MessageSink, TopicCreation, TopicSpec};

/// Publishes records through a shared [`MessageSink`], recovering from
/// missing topics by creating them on first use.
pub struct Publisher {
    sink: Arc<dyn MessageSink>,
    topic_spec: TopicSpec,
}

impl Publisher {
    /// Create a publisher over `sink` with the default [`TopicSpec`].
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            topic_spec: TopicSpec::default(),
        }
    }

    /// Override the spec applied to auto-created topics.
    pub fn with_topic_spec(mut self, topic_spec: TopicSpec) -> Self {
        self.topic_spec = topic_spec;
        self
    }

    /// Publish one record, creating the topic and retrying once if the
    /// first attempt fails because the topic does not exist.
    pub async fn publish(
        &self,
        topic: &str,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), PublishError> {
        let err = match self.sink.publish_raw(topic, key, value).await {
            Ok(()) => {
                counter!("ingest_messages_published_total").increment(1);
                return Ok(());
            }
            Err(err) => err,
        };

        if !classify::is_missing_topic(&err.to_string()) {
            counter!("ingest_publish_errors_total", "reason" => "write_failed").increment(1);
            return Err(PublishError::Write {
                topic: topic.to_string(),
                source: err,
            });
        }

        tracing::warn!(topic, error = %err, "topic missing, attempting to create it");
        self.create_topic(topic).await?;

        match self.sink.publish_raw(topic, key, value).await {
            Ok(()) => {
                counter!("ingest_messages_published_total").increment(1);
                Ok(())
            }
            Err(retry_err) => {
                counter!("ingest_publish_errors_total", "reason" => "write_retry_failed")
                    .increment(1);
                Err(PublishError::RetryFailed {
                    topic: topic.to_string(),
                    source: retry_err,
                })
            }
        }
    }

    /// Create `topic`, treating an already-existing topic as success.
    async fn create_topic(&self, topic: &str) -> Result<(), PublishError> {
        match self.sink.create_topic(topic, &self.topic_spec).await {
            Ok(TopicCreation::Created) => {
                counter!("ingest_topics_created_total").increment(1);
                tracing::info!(topic, "created missing topic");
                Ok(())
            }
            Ok(TopicCreation::AlreadyExists) => {
                tracing::debug!(topic, "topic created concurrently");
                Ok(())
            }
            // Some sinks surface the race as an error string instead of the
            // typed outcome; classify before giving up.
            Err(err) if classify::is_already_exists(&err.to_string()) => {
                tracing::debug!(topic, "topic created concurrently");
                Ok(())
            }
            Err(err) => {
                counter!("ingest_publish_errors_total", "reason" => "topic_creation_failed")
                    .increment(1);
                Err(PublishError::TopicCreation {
                    topic: topic.to_string(),
                    source: err,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use parking_lot::Mutex;
    use std::collections::{HashSet, VecDeque};

    fn missing_topic_error(topic: &str) -> SinkError {
        SinkError::new(format!("Unknown Topic Or Partition: '{topic}'"))
    }

    /// Scripted sink: pops pre-seeded results and records every call.
    #[derive(Default)]
    struct ScriptedSink {
        publish_results: Mutex<VecDeque<Result<(), SinkError>>>,
        create_results: Mutex<VecDeque<Result<TopicCreation, SinkError>>>,
        publishes: Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>,
        creates: Mutex<Vec<String>>,
    }

    impl ScriptedSink {
        fn publish_then(self, result: Result<(), SinkError>) -> Self {
            self.publish_results.lock().push_back(result);
            self
        }

        fn create_then(self, result: Result<TopicCreation, SinkError>) -> Self {
            self.create_results.lock().push_back(result);
            self
        }

        fn publish_count(&self) -> usize {
            self.publishes.lock().len()
        }

        fn create_count(&self) -> usize {
            self.creates.lock().len()
        }
    }

    #[async_trait::async_trait]
    impl MessageSink for ScriptedSink {
        async fn publish_raw(
            &self,
            topic: &str,
            key: &[u8],
            value: &[u8],
        ) -> Result<(), SinkError> {
            self.publishes
                .lock()
                .push((topic.to_string(), key.to_vec(), value.to_vec()));
            self.publish_results
                .lock()
                .pop_front()
                .expect("unexpected publish_raw call")
        }

        async fn create_topic(
            &self,
            topic: &str,
            _spec: &TopicSpec,
        ) -> Result<TopicCreation, SinkError> {
            self.creates.lock().push(topic.to_string());
            self.create_results
                .lock()
                .pop_front()
                .expect("unexpected create_topic call")
        }
    }

    // =========================================================================
    // Happy path
    // =========================================================================

    #[tokio::test]
    async fn test_publish_success_is_single_attempt() {
        let sink = Arc::new(ScriptedSink::default().publish_then(Ok(())));
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        publisher.publish("t1", b"r1", b"{}").await.unwrap();

        assert_eq!(sink.publish_count(), 1);
        assert_eq!(sink.create_count(), 0);
        let publishes = sink.publishes.lock();
        assert_eq!(publishes[0], ("t1".to_string(), b"r1".to_vec(), b"{}".to_vec()));
    }

    // =========================================================================
    // Missing-topic recovery
    // =========================================================================

    #[tokio::test]
    async fn test_missing_topic_creates_then_retries_once() {
        let sink = Arc::new(
            ScriptedSink::default()
                .publish_then(Err(missing_topic_error("t1")))
                .create_then(Ok(TopicCreation::Created))
                .publish_then(Ok(())),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        publisher.publish("t1", b"r1", b"{}").await.unwrap();

        assert_eq!(sink.publish_count(), 2);
        assert_eq!(sink.creates.lock().as_slice(), ["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_lost_creation_race_still_retries() {
        let sink = Arc::new(
            ScriptedSink::default()
                .publish_then(Err(missing_topic_error("t1")))
                .create_then(Ok(TopicCreation::AlreadyExists))
                .publish_then(Ok(())),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        publisher.publish("t1", b"r1", b"{}").await.unwrap();
        assert_eq!(sink.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_already_exists_error_text_counts_as_success() {
        let sink = Arc::new(
            ScriptedSink::default()
                .publish_then(Err(missing_topic_error("t1")))
                .create_then(Err(SinkError::new("Topic 't1' already exists")))
                .publish_then(Ok(())),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        publisher.publish("t1", b"r1", b"{}").await.unwrap();
        assert_eq!(sink.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_creation_failure_is_final_without_retry() {
        let sink = Arc::new(
            ScriptedSink::default()
                .publish_then(Err(missing_topic_error("t1")))
                .create_then(Err(SinkError::new("invalid replication factor"))),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        let err = publisher.publish("t1", b"r1", b"{}").await.unwrap_err();
        assert!(matches!(err, PublishError::TopicCreation { .. }));
        assert_eq!(sink.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_failure_is_final() {
        let sink = Arc::new(
            ScriptedSink::default()
                .publish_then(Err(missing_topic_error("t1")))
                .create_then(Ok(TopicCreation::Created))
                .publish_then(Err(SinkError::new("request timed out"))),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        let err = publisher.publish("t1", b"r1", b"{}").await.unwrap_err();
        assert!(matches!(err, PublishError::RetryFailed { .. }));
        assert_eq!(sink.publish_count(), 2);
    }

    // =========================================================================
    // Non-missing-topic failures
    // =========================================================================

    #[tokio::test]
    async fn test_other_publish_error_fails_without_creation_attempt() {
        let sink = Arc::new(
            ScriptedSink::default().publish_then(Err(SinkError::new("message too large"))),
        );
        let publisher = Publisher::new(Arc::clone(&sink) as Arc<dyn MessageSink>);

        let err = publisher.publish("t1", b"r1", b"{}").await.unwrap_err();
        assert!(matches!(err, PublishError::Write { .. }));
        assert_eq!(sink.publish_count(), 1);
        assert_eq!(sink.create_count(), 0);
    }

    // =========================================================================
    // Concurrent creation idempotence
    // =========================================================================

    /// Broker-shaped sink: publishes fail until the topic exists, creation
    /// reports whether this caller won the race.
    #[derive(Default)]
    struct InMemoryBroker {
        topics: Mutex<HashSet<String>>,
        fresh_creations: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl MessageSink for InMemoryBroker {
        async fn publish_raw(
            &self,
            topic: &str,
            _key: &[u8],
            _value: &[u8],
        ) -> Result<(), SinkError> {
            if self.topics.lock().contains(topic) {
                Ok(())
            } else {
                Err(missing_topic_error(topic))
            }
        }

        async fn create_topic(
            &self,
            topic: &str,
            _spec: &TopicSpec,
        ) -> Result<TopicCreation, SinkError> {
            if self.topics.lock().insert(topic.to_string()) {
                *self.fresh_creations.lock() += 1;
                Ok(TopicCreation::Created)
            } else {
                Ok(TopicCreation::AlreadyExists)
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_creation_is_idempotent() {
        let broker = Arc::new(InMemoryBroker::default());
        let publisher =
            Arc::new(Publisher::new(Arc::clone(&broker) as Arc<dyn MessageSink>));

        let a = {
            let publisher = Arc::clone(&publisher);
            tokio::spawn(async move { publisher.publish("fresh", b"a", b"1").await })
        };
        let b = {
            let publisher = Arc::clone(&publisher);
            tokio::spawn(async move { publisher.publish("fresh", b"b", b"2").await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // At most one caller observed a fresh creation; both publishes landed.
        assert_eq!(*broker.fresh_creations.lock(), 1);
        assert!(broker.topics.lock().contains("fresh"));
    }
}
