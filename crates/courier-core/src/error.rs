//! Unified error types for the Courier core.
//!
//! Routing-level registration errors, verification failures, payload errors
//! and outbound API errors live here so every adapter speaks the same
//! vocabulary when it turns a failure into an HTTP status.

use http::StatusCode;
use thiserror::Error;

/// Error type handlers return. Anything `Send + Sync` converts into it, so
/// `anyhow::Error` and friends work with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while registering a handler on a router.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The message pattern does not compile.
    #[error("invalid message pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as supplied by the caller.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A route key that must be non-empty was empty.
    #[error("route key '{0}' must not be empty")]
    EmptyKey(&'static str),
}

// =============================================================================
// Verification Errors
// =============================================================================

/// Errors raised by the verification gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// A header required for verification is absent.
    #[error("missing verification header '{0}'")]
    MissingHeader(&'static str),

    /// A verification header is present but unparseable.
    #[error("malformed verification header '{0}'")]
    MalformedHeader(&'static str),

    /// The signed timestamp is outside the accepted window.
    #[error("request timestamp {timestamp} is outside the accepted window")]
    StaleTimestamp {
        /// Timestamp presented by the caller.
        timestamp: i64,
    },

    /// The token or signature does not match.
    #[error("verification failed: credentials do not match")]
    Mismatch,
}

// =============================================================================
// Payload Errors
// =============================================================================

/// Errors raised while decoding an inbound payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// Body is not valid JSON or does not fit the expected shape.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    /// Form body is missing or undecodable.
    #[error("invalid form payload: {0}")]
    InvalidForm(String),

    /// A required field is absent.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A required header is absent.
    #[error("missing required header '{0}'")]
    MissingHeader(&'static str),

    /// The payload names a target nobody registered.
    #[error("unknown target '{0}'")]
    UnknownTarget(String),
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

// =============================================================================
// Webhook Errors
// =============================================================================

/// Terminal error of one inbound webhook request.
///
/// Each variant maps to exactly one response status, see [`WebhookError::status`].
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Verification failed on an ordinary request.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The payload could not be decoded.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Verification failed during the URL handshake.
    #[error("url verification handshake rejected")]
    ChallengeRejected,

    /// At least one awaited handler failed.
    #[error("{failed} awaited handler(s) failed")]
    HandlerFailed {
        /// Number of failed handlers.
        failed: usize,
    },
}

impl WebhookError {
    /// HTTP status this error answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Verification(_) => StatusCode::UNAUTHORIZED,
            Self::Payload(_) => StatusCode::BAD_REQUEST,
            Self::ChallengeRejected | Self::HandlerFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound provider API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, as text.
        body: String,
    },

    /// The provider reported an error inside a successful response.
    #[error("API error: {message}")]
    Api {
        /// Provider's error description.
        message: String,
    },

    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
