//! Builder pattern for LoadGenerator construction

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use crate::channel::{ChannelConfig, ResultSink};
use crate::config::{ConfigError, ParamSet, Rate, DEFAULT_UNRATED_CONCURRENCY};
use crate::error::{GenError, GenResult};
use crate::response::CallOutcome;
use crate::tickets::TicketPool;
use crate::traits::Caller;

use super::executor::LoadGenerator;

/// Builder for creating a [`LoadGenerator`] with validated parameters
///
/// # Example
///
/// ```ignore
/// let (generator, mut outcomes) = GeneratorBuilder::new()
///     .caller(caller)
///     .timeout(Duration::from_millis(100))
///     .rate(Rate::PerSecond(10))
///     .duration(Duration::from_secs(1))
///     .build()?;
///
/// generator.start();
/// while let Some(outcome) = outcomes.recv().await {
///     println!("{} {}", outcome.code, outcome.message);
/// }
/// ```
pub struct GeneratorBuilder {
    caller: Option<Arc<dyn Caller>>,
    params: ParamSet,
    channel_config: ChannelConfig,
}

impl GeneratorBuilder {
    /// Create a new builder; timeout and duration must be set before building,
    /// the rate defaults to unrated
    pub fn new() -> Self {
        Self {
            caller: None,
            params: ParamSet {
                timeout: Duration::ZERO,
                rate: Rate::PerSecond(0),
                duration: Duration::ZERO,
                unrated_concurrency: DEFAULT_UNRATED_CONCURRENCY,
            },
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full parameter set
    pub fn params(mut self, params: ParamSet) -> Self {
        self.params = params;
        self
    }

    /// Set the caller
    pub fn caller(mut self, caller: Arc<dyn Caller>) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Set the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.params.timeout = timeout;
        self
    }

    /// Set the target rate
    pub fn rate(mut self, rate: Rate) -> Self {
        self.params.rate = rate;
        self
    }

    /// Set the total run duration
    pub fn duration(mut self, duration: Duration) -> Self {
        self.params.duration = duration;
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Set the result channel capacity
    pub fn result_buffer(mut self, size: usize) -> Self {
        self.channel_config.result_buffer = size;
        self
    }

    /// Check everything [`build`](Self::build) checks, without building
    ///
    /// # Errors
    ///
    /// Returns every missing or out-of-range setting.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.caller.is_none() {
            errors.push(ConfigError::MissingCaller);
        }
        if let Err(mut invalid) = self.params.validate() {
            errors.append(&mut invalid);
        }
        let buffer = self.channel_config.result_buffer;
        if buffer == 0 {
            errors.push(ConfigError::ZeroResultBuffer);
        } else if buffer > Semaphore::MAX_PERMITS {
            errors.push(ConfigError::ResultBufferTooLarge(buffer));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build the generator and return it along with the outcome receiver
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] listing every missing or zero
    /// parameter; nothing is started in that case.
    pub fn build(self) -> GenResult<(LoadGenerator, mpsc::Receiver<CallOutcome>)> {
        if let Err(errors) = self.validate() {
            tracing::info!(errors = ?errors, "Load generator parameters rejected");
            return Err(GenError::InvalidParams(errors));
        }
        let Some(caller) = self.caller else {
            return Err(GenError::InvalidParams(vec![ConfigError::MissingCaller]));
        };
        let buffer = self.channel_config.result_buffer;

        let concurrency = self.params.concurrency();
        let tickets = TicketPool::new(concurrency)?;
        let (result_tx, result_rx) = mpsc::channel(buffer);

        tracing::info!(
            caller = caller.name(),
            timeout = ?self.params.timeout,
            rate = %self.params.rate,
            duration = ?self.params.duration,
            concurrency,
            result_buffer = buffer,
            "Load generator initialized"
        );

        let generator =
            LoadGenerator::new(self.params, caller, tickets, ResultSink::new(result_tx));

        Ok((generator, result_rx))
    }
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
