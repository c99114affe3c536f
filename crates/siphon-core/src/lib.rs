//! Core types and shared utilities for the Siphon ingest gateway.
//!
//! This crate provides:
//! - The canonical wire envelope (one mirrored HTTP request bound to a
//!   logical stream) accepted by the gateway
//! - Prometheus metrics helpers and the gateway metric catalog
//! - Shared error types

mod envelope;
mod error;
pub mod metrics;

pub use envelope::{IngestEnvelope, MirroredRequest, ENVELOPE_VERSION};
pub use error::{Error, Result};
