//! In-process echo caller

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use yload_core::{CallError, CallOutcome, Caller, RawRequest, RawResponse, RetCode};

use crate::operation::{Operation, OperationTemplate};

/// Caller whose callee lives in-process and echoes every payload back
///
/// Useful for exercising the engine without a network: `delay` simulates a
/// slow callee and `fail_every` a flaky transport.
#[derive(Debug)]
pub struct EchoCaller {
    template: OperationTemplate,
    delay: Option<Duration>,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl EchoCaller {
    /// Create an echo caller issuing operations named `op_name`
    pub fn new(op_name: impl Into<String>) -> Self {
        Self {
            template: OperationTemplate::new(op_name),
            delay: None,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Wait this long before echoing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every `n`th call with a transport error (0 disables)
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Calls performed so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for EchoCaller {
    fn default() -> Self {
        Self::new("op0")
    }
}

#[async_trait]
impl Caller for EchoCaller {
    fn name(&self) -> &str {
        "echo"
    }

    fn build_request(&self) -> RawRequest {
        self.template.build()
    }

    async fn call(&self, payload: &Bytes, _timeout: Duration) -> Result<Bytes, CallError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if matches!(self.fail_every, Some(every) if n % every == 0) {
            return Err(CallError::Transport(format!("echo connection reset (call {n})")));
        }

        Ok(payload.clone())
    }

    fn check_response(&self, request: RawRequest, response: RawResponse) -> CallOutcome {
        let echoed = match Operation::decode(&response.payload) {
            Ok(op) => op,
            Err(e) => {
                return CallOutcome::new(
                    request,
                    response,
                    RetCode::ResponseError,
                    format!("undecodable echo: {e}"),
                );
            }
        };

        match Operation::decode(&request.payload) {
            Ok(sent) if sent == echoed => CallOutcome::success(request, response),
            _ => {
                let message = format!(
                    "echo mismatch: got {}({:?}), expected {}",
                    echoed.op_name,
                    echoed.op_num,
                    self.template.op_name()
                );
                CallOutcome::new(request, response, RetCode::CalleeError, message)
            }
        }
    }
}
