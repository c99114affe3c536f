//! The canonical wire envelope accepted by the gateway.
//!
//! Client SDKs mirror observed HTTP requests into named logical streams by
//! POSTing one [`IngestEnvelope`] per request. The envelope carries an
//! explicit schema version so the wire format can evolve without silent
//! dual-format parsing; unknown versions are rejected at decode time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The envelope schema version this build accepts.
pub const ENVELOPE_VERSION: u32 = 1;

/// One HTTP request observed by a client SDK.
///
/// The record is opaque to the gateway: it is decoded only to be re-encoded
/// for the broker. `request_id` is the caller-supplied partition/dedup key
/// for downstream consumers; the gateway passes it through without enforcing
/// non-emptiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirroredRequest {
    /// Caller-supplied identifier, used as the broker record key.
    #[serde(default)]
    pub request_id: String,

    /// HTTP method of the mirrored request.
    pub method: String,

    /// Request path.
    pub path: String,

    /// Request headers. Order is not preserved.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Query parameters.
    #[serde(default)]
    pub query: HashMap<String, String>,

    /// Request body bytes, base64-encoded on the wire. Possibly empty.
    #[serde(default, with = "base64_bytes")]
    pub body: Vec<u8>,

    /// Capture time in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp_ns: u64,
}

impl MirroredRequest {
    /// Encode the record to the broker wire format (self-describing JSON).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The decoded request body: a stream identifier and one mirrored request.
///
/// Owned exclusively by the request-handling unit of work; never shared
/// across concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEnvelope {
    /// Explicit wire schema version. Defaults to the current version when
    /// the field is absent.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Logical stream name. Not a broker topic name.
    pub stream_id: String,

    /// The mirrored request record.
    pub request: MirroredRequest,
}

fn default_version() -> u32 {
    ENVELOPE_VERSION
}

impl IngestEnvelope {
    /// Decode and validate an envelope from raw request-body bytes.
    ///
    /// Rejects structurally malformed JSON, unsupported schema versions, and
    /// envelopes without a stream identifier. Decoding has no side effects.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(bytes)?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(Error::UnsupportedVersion(envelope.version));
        }
        if envelope.stream_id.is_empty() {
            return Err(Error::MissingField("stream_id"));
        }

        Ok(envelope)
    }
}

/// Serde adapter for base64-encoded byte fields.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_envelope_json() -> &'static str {
        r#"{"stream_id":"s1","request":{"request_id":"r1","method":"GET","path":"/x"}}"#
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn test_decode_minimal_envelope() {
        let envelope = IngestEnvelope::decode(minimal_envelope_json().as_bytes()).unwrap();
        assert_eq!(envelope.version, ENVELOPE_VERSION);
        assert_eq!(envelope.stream_id, "s1");
        assert_eq!(envelope.request.request_id, "r1");
        assert_eq!(envelope.request.method, "GET");
        assert_eq!(envelope.request.path, "/x");
        assert!(envelope.request.headers.is_empty());
        assert!(envelope.request.body.is_empty());
        assert_eq!(envelope.request.timestamp_ns, 0);
    }

    #[test]
    fn test_decode_full_envelope() {
        let json = r#"{
            "version": 1,
            "stream_id": "orders",
            "request": {
                "request_id": "req-42",
                "method": "POST",
                "path": "/api/orders",
                "headers": {"content-type": "application/json"},
                "query": {"dry_run": "true"},
                "body": "eyJvayI6dHJ1ZX0=",
                "timestamp_ns": 1700000000000000000
            }
        }"#;
        let envelope = IngestEnvelope::decode(json.as_bytes()).unwrap();
        assert_eq!(envelope.request.body, br#"{"ok":true}"#);
        assert_eq!(
            envelope.request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(envelope.request.timestamp_ns, 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = IngestEnvelope::decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_decode_missing_request() {
        let err = IngestEnvelope::decode(br#"{"stream_id":"s1"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_decode_empty_stream_id() {
        let json = r#"{"stream_id":"","request":{"method":"GET","path":"/"}}"#;
        let err = IngestEnvelope::decode(json.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingField("stream_id")));
    }

    #[test]
    fn test_decode_unsupported_version() {
        let json = r#"{"version":2,"stream_id":"s1","request":{"method":"GET","path":"/"}}"#;
        let err = IngestEnvelope::decode(json.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(2)));
    }

    #[test]
    fn test_decode_invalid_body_base64() {
        let json = r#"{"stream_id":"s1","request":{"method":"GET","path":"/","body":"!!!"}}"#;
        let err = IngestEnvelope::decode(json.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn test_body_base64_round_trip() {
        let envelope = IngestEnvelope {
            version: ENVELOPE_VERSION,
            stream_id: "s1".to_string(),
            request: MirroredRequest {
                request_id: "r1".to_string(),
                method: "PUT".to_string(),
                path: "/blob".to_string(),
                headers: HashMap::new(),
                query: HashMap::new(),
                body: vec![0x00, 0xff, 0x10, 0x7f],
                timestamp_ns: 1,
            },
        };

        let encoded = serde_json::to_vec(&envelope).unwrap();
        let decoded = IngestEnvelope::decode(&encoded).unwrap();
        assert_eq!(decoded.request.body, vec![0x00, 0xff, 0x10, 0x7f]);
    }

    #[test]
    fn test_mirrored_request_to_bytes_is_self_describing() {
        let envelope = IngestEnvelope::decode(minimal_envelope_json().as_bytes()).unwrap();
        let bytes = envelope.request.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["request_id"], "r1");
        assert_eq!(value["method"], "GET");
    }
}
