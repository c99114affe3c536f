//! Siphon Gateway - HTTP ingest surface for mirrored request streams.
//!
//! Client SDKs mirror observed HTTP requests into named logical streams.
//! This crate accepts those records over HTTP, authenticates the caller
//! against the stream, resolves the stream to its broker topic, and
//! publishes the record for downstream replay.
//!
//! # Request flow
//!
//! ```text
//! POST /ingest
//!   → readiness gate          (503 while dependencies are down)
//!   → decode envelope         (400 on malformed payloads)
//!   → verify credentials      (401, cause never disclosed)
//!   → resolve stream → topic  (404 for unknown/unauthorized streams)
//!   → serialize + publish     (500 after the recovery path is exhausted)
//!   → 202 "OK"
//! ```
//!
//! # Architecture
//!
//! - **AppState**: shared application state cloned into handlers
//! - **CredentialVerifier / TopicResolver**: startup-selected backends for
//!   the external credential and stream-metadata stores
//! - **ReadinessState**: background-refreshed dependency health snapshot
//! - **IngestPipeline**: the ordered publish pipeline, independent of HTTP

pub mod auth;
pub mod config;
mod error;
pub mod pipeline;
pub mod readiness;
pub mod resolve;
mod routes;
mod state;
pub mod store;

pub use self::config::{AuthBackend, Config};
pub use self::error::IngestError;
pub use self::routes::router;
pub use self::state::AppState;
