use reqwest::StatusCode;

use crate::error_chain_fmt;

/// Classified failures surfaced by [`RavenCommand`](crate::RavenCommand)
/// implementations. Local precondition failures (`InvalidArgument`,
/// `InvalidOperation`) are raised by `create_request` before any request is
/// built; the remaining variants come out of `set_response`.
#[derive(thiserror::Error)]
pub enum RavenDbError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("concurrency conflict: {message}")]
    ConcurrencyConflict {
        message: String,
        /// The etag the server currently holds for the document.
        actual_etag: Option<String>,
    },
    #[error("server error: {0}")]
    ServerError(String),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    /// The transport's own status-based failure, carried with the raw body so
    /// callers are not left with a generic "request failed" string.
    #[error("request failed with status {status}")]
    TransportError {
        status: StatusCode,
        body: Option<String>,
    },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for RavenDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
