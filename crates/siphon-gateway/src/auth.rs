//! Credential verification against named streams.
//!
//! The gateway never authenticates a caller in the abstract: credentials are
//! always checked against one stream and one permission. Backends implement
//! [`CredentialVerifier`] and are selected once at startup by configuration
//! ([`crate::AuthBackend`]), never by runtime type inspection in the request
//! path.
//!
//! The failure cause is kept internal. Callers see only a generic 401, so
//! probing cannot reveal whether a stream exists or how permissions are
//! structured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio_postgres::Client;

/// Permission a caller must hold on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Publish records into the stream.
    Write,
    /// Consume records from the stream.
    Read,
}

impl Permission {
    /// The grant name as stored in the metadata store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

/// The authenticated principal, for logging and audit only.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Authenticated username.
    pub username: String,
    /// Tenant the principal belongs to, when the backend knows it.
    pub tenant: Option<String>,
}

/// Why verification failed. Logged and metered, never disclosed.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header was supplied.
    #[error("missing credentials")]
    MissingCredentials,

    /// The header was not a decodable Basic credential pair.
    #[error("malformed Authorization header")]
    MalformedHeader,

    /// No matching user/stream/grant combination exists.
    #[error("unknown user, stream, or grant")]
    UnknownPrincipal,

    /// The user exists but the password did not match.
    #[error("invalid credentials")]
    BadPassword,

    /// The requested permission is not granted.
    #[error("permission '{0}' not granted")]
    NotGranted(&'static str),

    /// The verifier backend failed.
    #[error("auth backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Reason label recorded on the auth-failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::MalformedHeader => "malformed_header",
            Self::UnknownPrincipal => "unknown_principal",
            Self::BadPassword => "bad_password",
            Self::NotGranted(_) => "not_granted",
            Self::Backend(_) => "backend_error",
        }
    }
}

/// Validates a caller's credentials against a stream and permission.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify `auth_header` grants `permission` on `stream_id`.
    async fn verify(
        &self,
        auth_header: Option<&str>,
        stream_id: &str,
        permission: Permission,
    ) -> Result<Identity, AuthError>;
}

/// Parse an `Authorization: Basic base64(user:password)` header value.
pub fn parse_basic_auth(header: &str) -> Result<(String, String), AuthError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(AuthError::MalformedHeader)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedHeader)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;

    let (username, password) = decoded.split_once(':').ok_or(AuthError::MalformedHeader)?;
    if username.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok((username.to_string(), password.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Database backend
// ═══════════════════════════════════════════════════════════════════════════

/// Joins the stream to its tenant, the user within that tenant, and the
/// user's grant for the requested permission. Cross-tenant credentials
/// produce no row.
const VERIFY_QUERY: &str = "\
    SELECT u.password_hash, t.name \
    FROM streams s \
    JOIN tenants t ON t.id = s.tenant_id \
    JOIN users u ON u.tenant_id = s.tenant_id \
        AND u.username = $2 \
        AND u.deleted_at IS NULL \
    JOIN stream_grants g ON g.user_id = u.id \
        AND g.stream_id = s.id \
        AND g.permission = $3 \
    WHERE s.name = $1";

/// Basic auth against tenant-scoped users in the stream-metadata store.
///
/// Password hashes are bcrypt.
pub struct PgCredentialVerifier {
    client: Arc<Client>,
}

impl PgCredentialVerifier {
    /// Create a verifier over a shared metadata-store client.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialVerifier for PgCredentialVerifier {
    async fn verify(
        &self,
        auth_header: Option<&str>,
        stream_id: &str,
        permission: Permission,
    ) -> Result<Identity, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingCredentials)?;
        let (username, password) = parse_basic_auth(header)?;

        let row = self
            .client
            .query_opt(VERIFY_QUERY, &[&stream_id, &username, &permission.as_str()])
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?
            .ok_or(AuthError::UnknownPrincipal)?;

        let password_hash: String = row.get(0);
        let tenant: String = row.get(1);

        let matches =
            bcrypt::verify(&password, &password_hash).map_err(|e| AuthError::Backend(e.to_string()))?;
        if !matches {
            return Err(AuthError::BadPassword);
        }

        Ok(Identity {
            username,
            tenant: Some(tenant),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Static backend
// ═══════════════════════════════════════════════════════════════════════════

/// Write grants supplied directly in configuration, keyed by
/// `(stream, username)`. Useful for development and tests; passwords are
/// compared in constant time.
pub struct StaticCredentialVerifier {
    grants: HashMap<(String, String), String>,
}

impl StaticCredentialVerifier {
    /// Parse a `stream:username:password` comma-separated grant list.
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        let mut grants = HashMap::new();
        for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
            let mut parts = entry.trim().splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(stream), Some(username), Some(password))
                    if !stream.is_empty() && !username.is_empty() =>
                {
                    grants.insert(
                        (stream.to_string(), username.to_string()),
                        password.to_string(),
                    );
                }
                _ => anyhow::bail!(
                    "invalid static credential entry '{entry}' (expected stream:username:password)"
                ),
            }
        }
        if grants.is_empty() {
            anyhow::bail!("static credential list is empty");
        }
        Ok(Self { grants })
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(
        &self,
        auth_header: Option<&str>,
        stream_id: &str,
        permission: Permission,
    ) -> Result<Identity, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingCredentials)?;
        let (username, password) = parse_basic_auth(header)?;

        if permission != Permission::Write {
            return Err(AuthError::NotGranted(permission.as_str()));
        }

        let expected = self
            .grants
            .get(&(stream_id.to_string(), username.clone()))
            .ok_or(AuthError::UnknownPrincipal)?;

        if !bool::from(expected.as_bytes().ct_eq(password.as_bytes())) {
            return Err(AuthError::BadPassword);
        }

        Ok(Identity {
            username,
            tenant: None,
        })
    }
}
