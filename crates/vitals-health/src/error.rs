//! Health checker error types.

use thiserror::Error;

/// Errors from a single heartbeat attempt.
///
/// All of these are transient from the checker's point of view: the
/// retry policy absorbs them before they count against the failure budget.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("invalid control address: {0}")]
    InvalidAddress(String),

    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A failed probe cycle. Counted against the checker's failure budget.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("heartbeat failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: HeartbeatError,
    },

    #[error("heartbeat succeeded without a response payload")]
    EmptyResponse,
}
