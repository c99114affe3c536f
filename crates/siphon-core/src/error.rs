//! Error types shared across the Siphon crates.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or encoding wire payloads.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope declares a schema version this build does not speak.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    /// A field the wire contract requires was missing or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}
