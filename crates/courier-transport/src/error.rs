//! Transport error types.

use http::Method;
use thiserror::Error;

/// Errors that can occur while building or running the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Two endpoints claim the same method and path.
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute {
        /// Conflicting method.
        method: Method,
        /// Conflicting path.
        path: String,
    },

    /// Endpoint path is not absolute.
    #[error("invalid route path '{0}': must start with '/'")]
    InvalidPath(String),

    /// Endpoint method cannot be routed.
    #[error("unsupported route method: {0}")]
    UnsupportedMethod(Method),

    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The server stopped with an error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
