//! The caller capability the engine drives
//!
//! Defined in core so the dispatch engine stays protocol-agnostic.
//! Implementations live in `yload-callers`.

use crate::request::RawRequest;
use crate::response::{CallOutcome, RawResponse};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

// ============================================================================
// Caller Trait
// ============================================================================

/// Builds requests, performs calls against the callee, and classifies responses
///
/// A single instance is shared by every in-flight call task, so
/// implementations must be cheap to call concurrently.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Caller identifier used in logs (e.g. "http", "echo")
    fn name(&self) -> &str;

    /// Build one request
    ///
    /// Runs inside the ticket-bounded call task; keep it inexpensive.
    fn build_request(&self) -> RawRequest;

    /// Perform the network interaction
    ///
    /// `timeout` is a hint; the engine's own timer decides whether the
    /// attempt is reported as a timeout.
    async fn call(&self, payload: &Bytes, timeout: Duration) -> Result<Bytes, CallError>;

    /// Classify a completed response into success, response error or callee error
    fn check_response(&self, request: RawRequest, response: RawResponse) -> CallOutcome;
}

/// Transport failure returned by [`Caller::call`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// Connection or I/O failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller gave up on its own after the timeout hint
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_display() {
        assert_eq!(
            CallError::Transport("reset by peer".into()).to_string(),
            "transport error: reset by peer"
        );
        assert_eq!(
            CallError::Timeout(Duration::from_millis(20)).to_string(),
            "call timed out after 20ms"
        );
        assert!(CallError::InvalidRequest("empty body".into())
            .to_string()
            .contains("empty body"));
    }
}
