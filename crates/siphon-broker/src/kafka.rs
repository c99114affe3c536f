//! Kafka adapter for [`MessageSink`].
//!
//! Built on the pure-Rust `rskafka` client. Partition clients are cached
//! per topic; topic creation goes through the cluster controller. Stream
//! topics are provisioned single-partition (see [`crate::TopicSpec`]), so
//! records are produced to partition 0 and carry their key for downstream
//! ordering and dedup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use rskafka::chrono::Utc;
use rskafka::record::Record;

use crate::classify;
use crate::error::SinkError;
use crate::sink::{MessageSink, TopicCreation, TopicSpec};

/// The partition every stream topic is written to.
const STREAM_PARTITION: i32 = 0;

/// Shared Kafka write client.
///
/// Safe for concurrent use: `rskafka` partition clients are internally
/// synchronized and the per-topic cache is guarded by a short read-write
/// lock that is never held across I/O.
pub struct KafkaSink {
    client: Client,
    partitions: RwLock<HashMap<String, Arc<PartitionClient>>>,
}

impl KafkaSink {
    /// Connect to the broker(s) at `bootstrap` (host:port pairs).
    pub async fn connect(bootstrap: Vec<String>) -> Result<Self, SinkError> {
        let client = ClientBuilder::new(bootstrap)
            .build()
            .await
            .map_err(|e| SinkError::new(e.to_string()))?;

        Ok(Self {
            client,
            partitions: RwLock::new(HashMap::new()),
        })
    }

    /// Get or create the cached partition client for `topic`.
    ///
    /// Failures are not cached, so a missing topic is re-resolved on the
    /// post-creation retry.
    async fn partition_client(&self, topic: &str) -> Result<Arc<PartitionClient>, SinkError> {
        if let Some(existing) = self.partitions.read().get(topic) {
            return Ok(Arc::clone(existing));
        }

        let fresh = self
            .client
            .partition_client(topic, STREAM_PARTITION, UnknownTopicHandling::Error)
            .await
            .map_err(|e| SinkError::new(e.to_string()))?;
        let fresh = Arc::new(fresh);

        // A concurrent request may have resolved the same topic; keep the
        // first one inserted.
        let mut partitions = self.partitions.write();
        let entry = partitions
            .entry(topic.to_string())
            .or_insert_with(|| Arc::clone(&fresh));
        Ok(Arc::clone(entry))
    }
}

#[async_trait]
impl MessageSink for KafkaSink {
    async fn publish_raw(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), SinkError> {
        let partition = self.partition_client(topic).await?;

        let record = Record {
            key: Some(key.to_vec()),
            value: Some(value.to_vec()),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        partition
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(|e| SinkError::new(e.to_string()))?;

        Ok(())
    }

    async fn create_topic(
        &self,
        topic: &str,
        spec: &TopicSpec,
    ) -> Result<TopicCreation, SinkError> {
        let controller = self
            .client
            .controller_client()
            .map_err(|e| SinkError::new(e.to_string()))?;

        match controller
            .create_topic(topic, spec.partitions, spec.replication, spec.create_timeout_ms)
            .await
        {
            Ok(()) => Ok(TopicCreation::Created),
            Err(e) if classify::is_already_exists(&e.to_string()) => {
                Ok(TopicCreation::AlreadyExists)
            }
            Err(e) => Err(SinkError::new(e.to_string())),
        }
    }
}
