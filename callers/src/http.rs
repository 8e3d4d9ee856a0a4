//! HTTP caller backed by reqwest

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use yload_core::{CallError, CallOutcome, Caller, RawRequest, RawResponse, RetCode};

use crate::operation::OperationTemplate;

/// Added to the engine timeout before reqwest gives up on its own
const TIMEOUT_SLACK: Duration = Duration::from_millis(250);

/// Errors raised while setting up an [`HttpCaller`]
#[derive(Debug, thiserror::Error)]
pub enum HttpCallerError {
    /// The target URL could not be parsed
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// The HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Caller that POSTs each operation to an HTTP endpoint
///
/// The reply payload handed back to the engine carries the HTTP status in
/// front of the body so [`check_response`](Caller::check_response) can
/// classify it.
#[derive(Debug)]
pub struct HttpCaller {
    client: Client,
    url: Url,
    template: OperationTemplate,
}

impl HttpCaller {
    /// Create a caller targeting `url`, issuing operations named `op_name`
    pub fn new(url: &str, op_name: impl Into<String>) -> Result<Self, HttpCallerError> {
        let url = Url::parse(url).map_err(|e| HttpCallerError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            url,
            template: OperationTemplate::new(op_name),
        })
    }

    /// Target URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Caller for HttpCaller {
    fn name(&self) -> &str {
        "http"
    }

    fn build_request(&self) -> RawRequest {
        self.template.build()
    }

    async fn call(&self, payload: &Bytes, timeout: Duration) -> Result<Bytes, CallError> {
        // The engine timer reports the timeout; this one only bounds the socket.
        let timeout = timeout.saturating_add(TIMEOUT_SLACK);
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(payload.clone())
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        tracing::trace!(%status, bytes = body.len(), "HTTP reply received");
        Ok(encode_reply(status, &body))
    }

    fn check_response(&self, request: RawRequest, response: RawResponse) -> CallOutcome {
        let Some((status, _body)) = decode_reply(&response.payload) else {
            return CallOutcome::new(request, response, RetCode::ResponseError, "truncated reply");
        };

        if status.is_success() {
            CallOutcome::success(request, response)
        } else if status.is_server_error() {
            let message = format!("callee failed: {status}");
            CallOutcome::new(request, response, RetCode::CalleeError, message)
        } else {
            let message = format!("unexpected status: {status}");
            CallOutcome::new(request, response, RetCode::ResponseError, message)
        }
    }
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> CallError {
    if error.is_timeout() {
        CallError::Timeout(timeout)
    } else if error.is_builder() {
        CallError::InvalidRequest(error.to_string())
    } else {
        CallError::Transport(error.to_string())
    }
}

/// Prefix the body with the big-endian status code
fn encode_reply(status: StatusCode, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + body.len());
    buf.put_u16(status.as_u16());
    buf.put_slice(body);
    buf.freeze()
}

fn decode_reply(payload: &Bytes) -> Option<(StatusCode, Bytes)> {
    if payload.len() < 2 {
        return None;
    }
    let mut payload = payload.clone();
    let status = StatusCode::from_u16(payload.get_u16()).ok()?;
    Some((status, payload))
}
