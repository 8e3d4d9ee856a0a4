//! Load generator lifecycle and pacing loop

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::{DeliveryError, ResultSink};
use crate::config::ParamSet;
use crate::response::CallOutcome;
use crate::tickets::TicketPool;
use crate::traits::Caller;

use super::call;
use super::pacer::Pacer;
use super::stats::{Counters, GeneratorStats};
use super::status::{LifecycleState, Status};

/// State shared by the pacing loop and every call task
pub(crate) struct Shared {
    pub(crate) caller: Arc<dyn Caller>,
    pub(crate) params: ParamSet,
    pub(crate) tickets: TicketPool,
    pub(crate) sink: ResultSink,
    pub(crate) state: LifecycleState,
    pub(crate) counters: Counters,
}

impl Shared {
    /// Hand an outcome to the consumer without blocking
    ///
    /// Refused when the generator is not running or the channel is full;
    /// refusals are counted and logged, never escalated.
    pub(crate) fn deliver(&self, outcome: CallOutcome) -> bool {
        let status = self.state.get();
        if status != Status::Running {
            self.counters.record_dropped();
            tracing::warn!(
                id = ?outcome.id,
                code = %outcome.code,
                %status,
                "Generator not running, outcome dropped"
            );
            return false;
        }

        let id = outcome.id;
        let code = outcome.code;
        match self.sink.try_deliver(outcome) {
            Ok(()) => {
                self.counters.record_delivered();
                true
            }
            Err(DeliveryError::Full) => {
                self.counters.record_dropped();
                tracing::warn!(id = ?id, %code, "Result channel full, outcome dropped");
                false
            }
            Err(DeliveryError::Closed) => {
                self.counters.record_dropped();
                tracing::warn!(id = ?id, %code, "Result channel closed, outcome dropped");
                false
            }
        }
    }
}

/// Rate-paced load generator
///
/// Single-shot: [`start`](Self::start) moves it from `NotStarted` to
/// `Running`, [`stop`](Self::stop) from `Running` to `Stopped`, and a
/// stopped generator cannot be restarted. Dropping the generator ends a
/// running pacing loop.
pub struct LoadGenerator {
    shared: Arc<Shared>,

    /// Stops the pacing loop
    shutdown_tx: broadcast::Sender<()>,

    /// Pacing loop task, present between start and join
    pacing: Mutex<Option<JoinHandle<u64>>>,
}

impl LoadGenerator {
    /// Create a new generator
    ///
    /// Use [`GeneratorBuilder`](super::GeneratorBuilder), which validates
    /// the parameters and sizes the ticket pool.
    pub(crate) fn new(
        params: ParamSet,
        caller: Arc<dyn Caller>,
        tickets: TicketPool,
        sink: ResultSink,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shared: Arc::new(Shared {
                caller,
                params,
                tickets,
                sink,
                state: LifecycleState::new(),
                counters: Counters::default(),
            }),
            shutdown_tx,
            pacing: Mutex::new(None),
        }
    }

    /// Start dispatching calls
    ///
    /// Returns immediately. `false` if the generator was already started,
    /// or if called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("Load generator must be started from within a tokio runtime");
            return false;
        };

        // Subscribe before the transition so a concurrent stop is never missed.
        let shutdown_rx = self.shutdown_tx.subscribe();
        if !self
            .shared
            .state
            .transition(Status::NotStarted, Status::Running)
        {
            tracing::warn!(status = %self.status(), "Load generator start refused");
            return false;
        }

        let params = &self.shared.params;
        tracing::info!(
            caller = self.shared.caller.name(),
            timeout = ?params.timeout,
            rate = %params.rate,
            duration = ?params.duration,
            concurrency = self.shared.tickets.capacity(),
            "Starting load generator"
        );

        let deadline = Instant::now() + params.duration;
        let handle = runtime.spawn(pace(Arc::clone(&self.shared), shutdown_rx, deadline));
        *self.pacing.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        true
    }

    /// Stop dispatching and close the ticket pool and the result channel
    ///
    /// In-flight calls run to completion; their outcomes are dropped.
    /// `false` if the generator is not running.
    pub fn stop(&self) -> bool {
        if !self
            .shared
            .state
            .transition(Status::Running, Status::Stopped)
        {
            tracing::warn!(status = %self.status(), "Load generator stop refused");
            return false;
        }

        self.shared.tickets.close();
        let _ = self.shutdown_tx.send(());
        self.shared.sink.close();

        tracing::info!(
            dispatched = self.shared.counters.dispatched(),
            in_flight = self.shared.tickets.in_use(),
            "Load generator stopped"
        );
        true
    }

    /// Current lifecycle state
    pub fn status(&self) -> Status {
        self.shared.state.get()
    }

    /// Wait for the pacing loop to finish
    ///
    /// Returns the number of dispatched calls, or `None` if the generator
    /// was never started or has already been joined.
    pub async fn join(&self) -> Option<u64> {
        let handle = self
            .pacing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        match handle.await {
            Ok(dispatched) => Some(dispatched),
            Err(e) => {
                tracing::error!(error = %e, "Pacing loop task failed");
                None
            }
        }
    }

    /// Number of calls that may be in flight at once
    pub fn concurrency(&self) -> u32 {
        self.shared.tickets.capacity()
    }

    /// Calls dispatched so far
    pub fn call_count(&self) -> u64 {
        self.shared.counters.dispatched()
    }

    /// Tickets currently available
    pub fn remaining_tickets(&self) -> u32 {
        self.shared.tickets.remainder()
    }

    /// Whether the pacing loop can still take tickets
    ///
    /// Turns `false` once the generator is stopped or the run duration
    /// has elapsed.
    pub fn tickets_active(&self) -> bool {
        self.shared.tickets.is_active()
    }

    /// Snapshot of the dispatch counters
    pub fn stats(&self) -> GeneratorStats {
        self.shared
            .counters
            .snapshot(self.shared.tickets.in_use())
    }

    /// The parameters this generator runs with
    pub fn params(&self) -> &ParamSet {
        &self.shared.params
    }
}

impl std::fmt::Debug for LoadGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadGenerator")
            .field("caller", &self.shared.caller.name())
            .field("params", &self.shared.params)
            .field("concurrency", &self.concurrency())
            .field("status", &self.status())
            .field("sink_closed", &self.shared.sink.is_closed())
            .finish()
    }
}

/// Dispatch calls until the deadline passes or the generator is stopped
async fn pace(
    shared: Arc<Shared>,
    mut shutdown: broadcast::Receiver<()>,
    deadline: Instant,
) -> u64 {
    let mut pacer = Pacer::new(shared.params.rate);
    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);

    tracing::debug!(?pacer, "Pacing loop started");

    loop {
        let ticket = tokio::select! {
            biased;

            _ = shutdown.recv() => {
                tracing::debug!("Pacing loop received stop signal");
                break;
            }

            _ = &mut expired => {
                tracing::debug!("Run duration elapsed");
                break;
            }

            // Blocks while the pool is exhausted; that is the backpressure.
            ticket = async {
                pacer.tick().await;
                shared.tickets.take().await
            } => ticket,
        };

        match ticket {
            Ok(ticket) => {
                shared.counters.record_dispatch();
                tokio::spawn(call::run(Arc::clone(&shared), ticket));
            }
            Err(e) => {
                // stop() closes the pool before signalling shutdown
                tracing::debug!(error = %e, "Ticket pool closed, pacing loop stopping");
                break;
            }
        }
    }

    shared.tickets.close();
    shared.sink.close();
    let dispatched = shared.counters.dispatched();
    tracing::info!(dispatched, rated = pacer.is_rated(), "Pacing loop finished");
    dispatched
}
