use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::reconcile::ResourceKind;

/// Coarse classification of an [`Error`].
///
/// The executor retries only the retryable kinds; the reconciler only
/// intercepts [`Conflict`](Self::Conflict). Everything else passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused, reset, DNS failure, per-attempt timeout.
    Network,
    /// HTTP 401 / 403. Challenge-response negotiation and token freshness
    /// can fail transiently, so these are retried.
    AuthTransient,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerFault,
    /// HTTP 409 -- the named resource already exists.
    Conflict,
    /// HTTP 404, or a lookup by natural key came back empty.
    NotFound,
    /// HTTP 400 / 422 -- the server rejected the request body.
    Invalid,
    /// Any other 4xx.
    ClientError,
    /// The token handshake returned something the client can't use.
    Protocol,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The overall per-call deadline elapsed.
    Timeout,
    /// Failures that never reached the server: bad URLs, TLS setup,
    /// body encoding, response decoding.
    Local,
}

impl ErrorKind {
    /// Classify an HTTP status. Returns `None` for statuses in `[200, 400)`.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        let code = status.as_u16();
        if (200..400).contains(&code) {
            return None;
        }
        Some(match code {
            401 | 403 => Self::AuthTransient,
            429 => Self::RateLimited,
            409 => Self::Conflict,
            404 => Self::NotFound,
            400 | 422 => Self::Invalid,
            500..=599 => Self::ServerFault,
            _ => Self::ClientError,
        })
    }

    /// Whether the executor may spend another attempt on this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::AuthTransient | Self::RateLimited | Self::ServerFault
        )
    }
}

/// Top-level error type for the `iisadm-api` crate.
///
/// Every variant produced by a network exchange carries the method, URL,
/// status and raw body, so a failure can be diagnosed from the message alone.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The request never produced a response.
    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status outside `[200, 400)`, either
    /// terminal on the first try or still failing when retries ran out.
    #[error("{method} {url} returned invalid status code: {status} (after {attempts} attempt(s))\n{body}")]
    Api {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
        attempts: u32,
    },

    /// The caller cancelled the call (in flight or during backoff).
    #[error("{method} {url} cancelled")]
    Cancelled { method: Method, url: String },

    /// The overall deadline for one logical call elapsed.
    #[error("{method} {url} timed out after {timeout_secs}s")]
    Timeout {
        method: Method,
        url: String,
        timeout_secs: u64,
    },

    // ── Token handshake ─────────────────────────────────────────────
    /// Step one succeeded but carried no anti-forgery header.
    #[error("anti-forgery header '{header}' not found in handshake response")]
    MissingAntiForgeryToken { header: String },

    /// Step one returned something other than 200.
    #[error("token handshake request failed (HTTP {status}): {body}")]
    HandshakeRequestFailed { status: StatusCode, body: String },

    /// Step two returned something other than 200/201.
    #[error("token issuance failed (HTTP {status}): {body}")]
    TokenIssuanceFailed { status: StatusCode, body: String },

    /// The issued token does not have the contract length.
    #[error("invalid token length: got {actual}, expected {expected}")]
    InvalidTokenFormat { expected: usize, actual: usize },

    // ── Resources ───────────────────────────────────────────────────
    /// A lookup by natural key found nothing.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: ResourceKind, key: String },

    // ── Local ───────────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A configured proxy URL was rejected by the HTTP client.
    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A credential could not be encoded as an HTTP header value.
    #[error("Invalid value for header {header}")]
    InvalidHeader { header: &'static str },

    /// Request body serialization failed.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Network,
            Self::Api { status, .. } => {
                ErrorKind::from_status(*status).unwrap_or(ErrorKind::ClientError)
            }
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::MissingAntiForgeryToken { .. }
            | Self::HandshakeRequestFailed { .. }
            | Self::TokenIssuanceFailed { .. }
            | Self::InvalidTokenFormat { .. } => ErrorKind::Protocol,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidUrl(_)
            | Self::Tls(_)
            | Self::InvalidProxy { .. }
            | Self::InvalidHeader { .. }
            | Self::Encode(_)
            | Self::Deserialization { .. } => ErrorKind::Local,
        }
    }

    /// The HTTP status the server answered with, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. }
            | Self::HandshakeRequestFailed { status, .. }
            | Self::TokenIssuanceFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body, if the server sent one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. }
            | Self::HandshakeRequestFailed { body, .. }
            | Self::TokenIssuanceFailed { body, .. }
            | Self::Deserialization { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for 409 Conflict responses.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Returns `true` for 404 responses and empty natural-key lookups.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Returns `true` if the caller cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}
