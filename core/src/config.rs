//! Load generator configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Upper bound for the derived ticket count
pub const MAX_CONCURRENCY: u32 = i32::MAX as u32;

/// Ticket count used when the rate is [`Rate::Unrated`] and none is configured
pub const DEFAULT_UNRATED_CONCURRENCY: u32 = 1024;

/// Target load rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    /// Issue this many calls per second; zero behaves as [`Rate::Unrated`]
    PerSecond(u32),
    /// Fire as fast as tickets allow
    Unrated,
}

impl Rate {
    /// Time between two consecutive calls, `None` when unrated
    pub fn interval(&self) -> Option<Duration> {
        match *self {
            Rate::PerSecond(0) | Rate::Unrated => None,
            Rate::PerSecond(lps) => {
                let nanos = (NANOS_PER_SEC / u128::from(lps)).max(1);
                Some(Duration::from_nanos(nanos as u64))
            }
        }
    }

    /// Whether calls are paced by a ticker
    pub fn is_rated(&self) -> bool {
        self.interval().is_some()
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rate::PerSecond(0) | Rate::Unrated => write!(f, "unrated"),
            Rate::PerSecond(lps) => write!(f, "{lps}/s"),
        }
    }
}

/// Parameters of a load generation run
///
/// Immutable once handed to a [`GeneratorBuilder`](crate::GeneratorBuilder):
/// the builder validates them and derives the ticket count from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSet {
    /// Per-call timeout
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,

    /// Target load rate
    pub rate: Rate,

    /// Total run duration
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,

    /// Ticket count when the rate is unrated
    #[serde(default = "default_unrated_concurrency")]
    pub unrated_concurrency: u32,
}

fn default_unrated_concurrency() -> u32 {
    DEFAULT_UNRATED_CONCURRENCY
}

impl ParamSet {
    /// Create a rated parameter set
    pub fn new(timeout: Duration, lps: u32, duration: Duration) -> Self {
        Self {
            timeout,
            rate: Rate::PerSecond(lps),
            duration,
            unrated_concurrency: DEFAULT_UNRATED_CONCURRENCY,
        }
    }

    /// Switch to unrated firing, bounded by `concurrency` tickets
    pub fn unrated(mut self, concurrency: u32) -> Self {
        self.rate = Rate::Unrated;
        self.unrated_concurrency = concurrency;
        self
    }

    /// Validate the parameters, reporting every violation
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.timeout.is_zero() {
            errors.push(ConfigError::ZeroTimeout);
        }
        if self.duration.is_zero() {
            errors.push(ConfigError::ZeroDuration);
        }
        if !self.rate.is_rated() && self.unrated_concurrency == 0 {
            errors.push(ConfigError::ZeroUnratedConcurrency);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Number of calls that may be in flight at once
    ///
    /// `timeout / interval + 1`: how many calls overlap when each one takes
    /// the whole timeout while new ones keep arriving at the configured rate.
    pub fn concurrency(&self) -> u32 {
        let total = match self.rate.interval() {
            Some(interval) => self.timeout.as_nanos() / interval.as_nanos() + 1,
            None => u128::from(self.unrated_concurrency.max(1)),
        };
        total.min(u128::from(MAX_CONCURRENCY)) as u32
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No caller was supplied
    #[error("invalid caller: none supplied")]
    MissingCaller,

    /// Timeout is zero
    #[error("invalid timeout: must be greater than zero")]
    ZeroTimeout,

    /// Duration is zero
    #[error("invalid duration: must be greater than zero")]
    ZeroDuration,

    /// Result channel has no capacity
    #[error("invalid result channel: buffer must be greater than zero")]
    ZeroResultBuffer,

    /// Result channel larger than the channel can be sized
    #[error("invalid result channel: buffer of {0} exceeds the channel limit")]
    ResultBufferTooLarge(usize),

    /// Unrated run without any tickets
    #[error("invalid unrated concurrency: must be greater than zero")]
    ZeroUnratedConcurrency,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_from_timeout_and_rate() {
        // 100ms timeout at 10/s: one call in flight plus the next arrival
        let params = ParamSet::new(Duration::from_millis(100), 10, Duration::from_secs(1));
        assert_eq!(params.concurrency(), 2);

        let params = ParamSet::new(Duration::from_millis(50), 100, Duration::from_secs(1));
        assert_eq!(params.concurrency(), 6);

        let params = ParamSet::new(Duration::from_secs(3), 1000, Duration::from_secs(1));
        assert_eq!(params.concurrency(), 3001);
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let params = ParamSet::new(
            Duration::from_secs(u64::MAX / 4),
            u32::MAX,
            Duration::from_secs(1),
        );
        assert_eq!(params.concurrency(), MAX_CONCURRENCY);
    }

    #[test]
    fn test_concurrency_unrated() {
        let params =
            ParamSet::new(Duration::from_millis(100), 1, Duration::from_secs(1)).unrated(8);
        assert_eq!(params.concurrency(), 8);
        assert!(!params.rate.is_rated());
    }

    #[test]
    fn test_interval() {
        assert_eq!(Rate::PerSecond(4).interval(), Some(Duration::from_millis(250)));
        assert_eq!(Rate::PerSecond(0).interval(), None);
        assert_eq!(Rate::Unrated.interval(), None);
        // Rates above one per nanosecond still tick
        assert_eq!(Rate::PerSecond(u32::MAX).interval(), Some(Duration::from_nanos(1)));
    }

    #[test]
    fn test_validation_valid() {
        let params = ParamSet::new(Duration::from_millis(500), 5, Duration::from_secs(1));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validation_reports_all_errors() {
        let params = ParamSet::new(Duration::ZERO, 10, Duration::ZERO);
        let errors = params.validate().unwrap_err();

        assert_eq!(
            errors,
            vec![ConfigError::ZeroTimeout, ConfigError::ZeroDuration]
        );
    }

    #[test]
    fn test_zero_rate_is_unrated() {
        let params = ParamSet::new(Duration::from_millis(100), 0, Duration::from_secs(1));
        assert!(params.validate().is_ok());
        assert!(!params.rate.is_rated());
        assert_eq!(params.rate.to_string(), "unrated");
        assert_eq!(params.concurrency(), DEFAULT_UNRATED_CONCURRENCY);
    }

    #[test]
    fn test_validation_unrated_without_tickets() {
        let params = ParamSet::new(Duration::from_millis(10), 1, Duration::from_secs(1)).unrated(0);
        assert_eq!(
            params.validate().unwrap_err(),
            vec![ConfigError::ZeroUnratedConcurrency]
        );
    }

    #[test]
    fn test_param_set_json_format() {
        let params = ParamSet::new(Duration::from_millis(250), 20, Duration::from_secs(2));
        let json = serde_json::to_string(&params).unwrap();

        assert!(json.contains("\"timeout_ms\":250"));
        assert!(json.contains("\"duration_ms\":2000"));
        assert!(json.contains("\"per_second\":20"));

        let parsed: ParamSet =
            serde_json::from_str(r#"{"timeout_ms":100,"rate":"unrated","duration_ms":1000}"#)
                .unwrap();
        assert_eq!(parsed.rate, Rate::Unrated);
        assert_eq!(parsed.unrated_concurrency, DEFAULT_UNRATED_CONCURRENCY);
    }
}
