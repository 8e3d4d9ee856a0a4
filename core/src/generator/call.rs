//! One call attempt: build -> arm timer -> call -> resolve -> deliver
//!
//! The timer and the call race through a shared [`CallState`]: whichever
//! leaves `Pending` first delivers the outcome, the other one is discarded.
//! A call that returns after the timeout has elapsed is a timeout no matter
//! which side wins the race or what the caller reported.
//! The ticket is held until the call itself returns, even when the timer
//! has already reported a timeout, so the pool always reflects real
//! in-flight work.

use crate::request::RawRequest;
use crate::response::{CallOutcome, RawResponse};
use crate::tickets::Ticket;

use super::executor::Shared;
use super::status::{CallState, CallStatus};

use bytes::Bytes;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What the attempt got done before it returned or unwound
#[derive(Default)]
struct Progress {
    request: Option<RawRequest>,
    delivered: bool,
}

/// Run one call attempt and release its ticket
pub(crate) async fn run(shared: Arc<Shared>, ticket: Ticket) {
    let state = Arc::new(CallState::new());
    let mut progress = Progress::default();

    let result = AssertUnwindSafe(attempt(&shared, &state, &mut progress))
        .catch_unwind()
        .await;

    if let Err(panic) = result {
        let message = panic_message(panic.as_ref());
        tracing::error!(caller = shared.caller.name(), %message, "Call task fault recovered");

        // The timer may already own this call; otherwise the fault is its outcome.
        state.claim(CallStatus::Completed);
        if state.get() == CallStatus::Completed && !progress.delivered {
            shared.deliver(CallOutcome::fatal(progress.request, message));
        }
    }

    ticket.release();
}

async fn attempt(shared: &Arc<Shared>, state: &Arc<CallState>, progress: &mut Progress) {
    let timeout = shared.params.timeout;
    let request = shared.caller.build_request();
    progress.request = Some(request.clone());

    let timer = TimeoutTimer::arm(Arc::clone(shared), Arc::clone(state), request.clone(), timeout);

    let start = Instant::now();
    let result = shared.caller.call(&request.payload, timeout).await;
    let elapsed = start.elapsed();

    if elapsed >= timeout {
        if state.claim(CallStatus::TimedOut) {
            timer.cancel();
            tracing::debug!(id = %request.id, ?timeout, ?elapsed, "Call timed out");
            shared.deliver(CallOutcome::timeout(request, timeout));
            progress.delivered = true;
        } else {
            tracing::debug!(id = %request.id, ?elapsed, "Late response discarded");
        }
        return;
    }

    if !state.claim(CallStatus::Completed) {
        tracing::debug!(id = %request.id, ?elapsed, "Late response discarded");
        return;
    }
    timer.cancel();

    let id = request.id;
    let outcome = match result {
        Ok(payload) => {
            let response = RawResponse {
                id,
                payload,
                error: None,
                elapsed,
            };
            let mut outcome = shared.caller.check_response(request, response);
            outcome.elapsed = elapsed;
            outcome
        }
        Err(error) => {
            let response = RawResponse {
                id,
                payload: Bytes::new(),
                error: Some(error),
                elapsed,
            };
            CallOutcome::call_error(request, response)
        }
    };

    tracing::debug!(%id, code = %outcome.code, ?elapsed, "Call completed");
    shared.deliver(outcome);
    progress.delivered = true;
}

/// One-shot timeout timer, cancelled when dropped
struct TimeoutTimer(JoinHandle<()>);

impl TimeoutTimer {
    fn arm(
        shared: Arc<Shared>,
        state: Arc<CallState>,
        request: RawRequest,
        timeout: Duration,
    ) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if state.claim(CallStatus::TimedOut) {
                tracing::debug!(id = %request.id, ?timeout, "Call timed out");
                shared.deliver(CallOutcome::timeout(request, timeout));
            }
        }))
    }

    fn cancel(self) {}
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("Async call panic! (error: {msg})")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("Async call panic! (error: {msg})")
    } else {
        "Async call panic! (clue: non-string panic payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_str() {
        let payload: Box<dyn Any + Send> = Box::new("bad state");
        assert_eq!(
            panic_message(payload.as_ref()),
            "Async call panic! (error: bad state)"
        );
    }

    #[test]
    fn test_panic_message_string() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("index 3 out of range"));
        assert!(panic_message(payload.as_ref()).contains("index 3 out of range"));
    }

    #[test]
    fn test_panic_message_other() {
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert!(panic_message(payload.as_ref()).contains("clue"));
    }
}
