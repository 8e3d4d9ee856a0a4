//! Raw responses, result codes and call outcomes

use crate::request::{RawRequest, RequestId};
use crate::traits::CallError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response to a [`RawRequest`], produced by the engine from [`Caller::call`](crate::Caller::call)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Identifier of the originating request
    pub id: RequestId,

    /// Opaque payload returned by the callee (empty on error)
    pub payload: Bytes,

    /// Transport-level error, if the call failed
    pub error: Option<CallError>,

    /// Time spent inside the call
    pub elapsed: Duration,
}

impl RawResponse {
    /// Whether the call itself failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result code of one call attempt
///
/// Codes 1 to 1000 are left to callee-defined results; the engine only
/// produces the variants below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetCode {
    /// The call succeeded
    Success,
    /// The engine's timer fired before the call completed
    CallTimeout,
    /// Transport or connection failure
    CallError,
    /// Malformed response
    ResponseError,
    /// The callee reported an internal failure
    CalleeError,
    /// Unexpected fault inside the call task
    FatalCall,
}

impl RetCode {
    /// Every result code, in numeric order
    pub const ALL: [RetCode; 6] = [
        RetCode::Success,
        RetCode::CallTimeout,
        RetCode::CallError,
        RetCode::ResponseError,
        RetCode::CalleeError,
        RetCode::FatalCall,
    ];

    /// Stable numeric code
    pub fn code(&self) -> u16 {
        match self {
            RetCode::Success => 0,
            RetCode::CallTimeout => 1001,
            RetCode::CallError => 2001,
            RetCode::ResponseError => 2002,
            RetCode::CalleeError => 2003,
            RetCode::FatalCall => 3001,
        }
    }

    /// Check if this code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, RetCode::Success)
    }
}

impl std::fmt::Display for RetCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plain = match self {
            RetCode::Success => "Success",
            RetCode::CallTimeout => "Call Timeout Warning",
            RetCode::CallError => "Call Error",
            RetCode::ResponseError => "Response Error",
            RetCode::CalleeError => "Callee Error",
            RetCode::FatalCall => "Call Fatal Error",
        };
        f.write_str(plain)
    }
}

/// The structured result of one call attempt, delivered to the result sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Request identifier; `None` if the task faulted before building a request
    pub id: Option<RequestId>,

    /// Originating request
    pub request: Option<RawRequest>,

    /// Response, if the call completed
    pub response: Option<RawResponse>,

    /// Result code
    pub code: RetCode,

    /// Free-text note
    pub message: String,

    /// Elapsed time of the attempt
    pub elapsed: Duration,
}

impl CallOutcome {
    /// Outcome for a completed call, taking the elapsed time from the response
    pub fn new(
        request: RawRequest,
        response: RawResponse,
        code: RetCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(request.id),
            elapsed: response.elapsed,
            request: Some(request),
            response: Some(response),
            code,
            message: message.into(),
        }
    }

    /// Successful outcome
    pub fn success(request: RawRequest, response: RawResponse) -> Self {
        Self::new(request, response, RetCode::Success, "")
    }

    /// Outcome synthesized by the timeout timer
    pub(crate) fn timeout(request: RawRequest, timeout: Duration) -> Self {
        Self {
            id: Some(request.id),
            request: Some(request),
            response: None,
            code: RetCode::CallTimeout,
            message: format!("Timeout! (expected: < {timeout:?})"),
            elapsed: timeout,
        }
    }

    /// Outcome for a call whose transport failed
    pub(crate) fn call_error(request: RawRequest, response: RawResponse) -> Self {
        let message = response
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Self::new(request, response, RetCode::CallError, message)
    }

    /// Outcome for a fault recovered at the task boundary
    pub(crate) fn fatal(request: Option<RawRequest>, message: String) -> Self {
        Self {
            id: request.as_ref().map(|r| r.id),
            request,
            response: None,
            code: RetCode::FatalCall,
            message,
            elapsed: Duration::ZERO,
        }
    }

    /// Check if the attempt succeeded
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: u64, elapsed: Duration, error: Option<CallError>) -> RawResponse {
        RawResponse {
            id: RequestId(id),
            payload: Bytes::from_static(b"pong"),
            error,
            elapsed,
        }
    }

    #[test]
    fn test_ret_code_numbers() {
        let codes: Vec<u16> = RetCode::ALL.iter().map(RetCode::code).collect();
        assert_eq!(codes, vec![0, 1001, 2001, 2002, 2003, 3001]);
    }

    #[test]
    fn test_ret_code_plain_text() {
        assert_eq!(RetCode::Success.to_string(), "Success");
        assert_eq!(RetCode::CallTimeout.to_string(), "Call Timeout Warning");
        assert_eq!(RetCode::CalleeError.to_string(), "Callee Error");
        assert_eq!(RetCode::FatalCall.to_string(), "Call Fatal Error");
    }

    #[test]
    fn test_ret_code_snake_case_serialization() {
        assert_eq!(
            serde_json::to_string(&RetCode::CallTimeout).unwrap(),
            "\"call_timeout\""
        );
        assert_eq!(
            serde_json::to_string(&RetCode::ResponseError).unwrap(),
            "\"response_error\""
        );
    }

    #[test]
    fn test_outcome_takes_elapsed_from_response() {
        let req = RawRequest::new(1u64, "ping");
        let outcome = CallOutcome::success(req, response(1, Duration::from_millis(12), None));

        assert!(outcome.is_success());
        assert_eq!(outcome.id, Some(RequestId(1)));
        assert_eq!(outcome.elapsed, Duration::from_millis(12));
    }

    #[test]
    fn test_timeout_outcome() {
        let outcome = CallOutcome::timeout(RawRequest::new(3u64, "x"), Duration::from_millis(100));

        assert_eq!(outcome.code, RetCode::CallTimeout);
        assert_eq!(outcome.elapsed, Duration::from_millis(100));
        assert!(outcome.message.contains("100ms"));
        assert!(outcome.response.is_none());
    }

    #[test]
    fn test_call_error_outcome_carries_error_text() {
        let resp = response(
            2,
            Duration::from_millis(3),
            Some(CallError::Transport("connection refused".into())),
        );
        assert!(resp.is_error());

        let outcome = CallOutcome::call_error(RawRequest::new(2u64, "x"), resp);
        assert_eq!(outcome.code, RetCode::CallError);
        assert!(outcome.message.contains("connection refused"));
        assert_eq!(outcome.elapsed, Duration::from_millis(3));
    }

    #[test]
    fn test_fatal_outcome_without_request() {
        let outcome = CallOutcome::fatal(None, "boom".into());
        assert_eq!(outcome.id, None);
        assert_eq!(outcome.code, RetCode::FatalCall);
    }
}
