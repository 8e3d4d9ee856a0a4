//! Result channel configuration and the engine's write end

use crate::response::CallOutcome;

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Channel buffer configuration for outcome delivery
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Result buffer size (engine -> consumer)
    pub result_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            result_buffer: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with custom result buffer size
    pub fn with_result_buffer(mut self, size: usize) -> Self {
        self.result_buffer = size;
        self
    }
}

/// Why an outcome was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryError {
    /// The buffer was full
    Full,
    /// The sink was closed or the consumer went away
    Closed,
}

/// Write end of the result channel
///
/// Delivery never blocks: a full buffer drops the outcome. Closing swaps the
/// sender out, so it happens at most once and the consumer observes
/// end-of-stream as soon as in-progress sends finish.
pub(crate) struct ResultSink {
    tx: ArcSwapOption<mpsc::Sender<CallOutcome>>,
}

impl ResultSink {
    pub(crate) fn new(tx: mpsc::Sender<CallOutcome>) -> Self {
        Self {
            tx: ArcSwapOption::from_pointee(tx),
        }
    }

    /// Try to hand an outcome to the consumer without waiting
    pub(crate) fn try_deliver(&self, outcome: CallOutcome) -> Result<(), DeliveryError> {
        let guard = self.tx.load();
        let Some(tx) = &*guard else {
            return Err(DeliveryError::Closed);
        };

        match tx.try_send(outcome) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::Full),
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed),
        }
    }

    /// Close the sink; returns `true` only for the call that closed it
    pub(crate) fn close(&self) -> bool {
        let previous: Option<Arc<_>> = self.tx.swap(None);
        previous.is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.load().is_none()
    }
}
