//! Broker publishing for the Siphon ingest gateway.
//!
//! This crate owns the write side of the gateway: a [`MessageSink`] trait
//! over the broker client, a [`Publisher`] that wraps one publish attempt
//! with topic-auto-creation recovery, and the Kafka adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  Publisher   │  publish → classify failure → create topic → retry once
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │ MessageSink  │  publish_raw / create_topic
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  KafkaSink   │  rskafka partition clients + controller client
//! └──────────────┘
//! ```
//!
//! Topic auto-creation is safe here because the publisher only ever receives
//! topic names from the gateway's trusted stream resolution, after the
//! caller's write claim on that stream has been verified.

pub mod classify;
mod error;
mod kafka;
mod publisher;
mod sink;

pub use error::{PublishError, SinkError};
pub use kafka::KafkaSink;
pub use publisher::Publisher;
pub use sink::{MessageSink, TopicCreation, TopicSpec};
