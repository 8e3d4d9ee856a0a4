//! Run configuration: JSON file merged with command-line overrides

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use yload_callers::{EchoCaller, HttpCaller};
use yload_core::{Caller, ChannelConfig, ParamSet, Rate};

/// Which caller the run drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// In-process echo callee
    #[default]
    Echo,
    /// HTTP endpoint
    Http,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Echo => write!(f, "echo"),
            Target::Http => write!(f, "http"),
        }
    }
}

/// Echo callee behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Simulated callee latency in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Fail every Nth call (0 never fails)
    #[serde(default)]
    pub fail_every: u64,
}

/// Everything a run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Engine parameters
    #[serde(flatten)]
    pub params: ParamSet,

    #[serde(default)]
    pub target: Target,

    /// Endpoint for the http target
    #[serde(default)]
    pub url: Option<String>,

    /// Operation name sent with every request
    #[serde(default = "default_op_name")]
    pub op_name: String,

    /// Result channel capacity
    #[serde(default = "default_result_buffer")]
    pub result_buffer: usize,

    #[serde(default)]
    pub echo: EchoConfig,
}

fn default_op_name() -> String {
    "op0".to_string()
}

fn default_result_buffer() -> usize {
    ChannelConfig::default().result_buffer
}

impl Default for RunConfig {
    /// Zero timeout, rate and duration: each must come from a file or a flag
    fn default() -> Self {
        Self {
            params: ParamSet::new(Duration::ZERO, 0, Duration::ZERO),
            target: Target::default(),
            url: None,
            op_name: default_op_name(),
            result_buffer: default_result_buffer(),
            echo: EchoConfig::default(),
        }
    }
}

/// Values given on the command line; each one overrides the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<Target>,
    pub url: Option<String>,
    pub op_name: Option<String>,
    pub timeout_ms: Option<u64>,
    pub rate: Option<u32>,
    pub unrated: Option<u32>,
    pub duration_ms: Option<u64>,
    pub buffer: Option<usize>,
    pub echo_delay_ms: Option<u64>,
    pub echo_fail_every: Option<u64>,
}

impl RunConfig {
    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(target) = overrides.target {
            self.target = target;
        }
        if let Some(url) = overrides.url {
            self.url = Some(url);
        }
        if let Some(op_name) = overrides.op_name {
            self.op_name = op_name;
        }
        if let Some(ms) = overrides.timeout_ms {
            self.params.timeout = Duration::from_millis(ms);
        }
        if let Some(lps) = overrides.rate {
            self.params.rate = Rate::PerSecond(lps);
        }
        if let Some(concurrency) = overrides.unrated {
            self.params = self.params.unrated(concurrency);
        }
        if let Some(ms) = overrides.duration_ms {
            self.params.duration = Duration::from_millis(ms);
        }
        if let Some(buffer) = overrides.buffer {
            self.result_buffer = buffer;
        }
        if let Some(ms) = overrides.echo_delay_ms {
            self.echo.delay_ms = ms;
        }
        if let Some(n) = overrides.echo_fail_every {
            self.echo.fail_every = n;
        }
        self
    }

    /// Construct the caller this configuration targets
    pub fn build_caller(&self) -> Result<Arc<dyn Caller>> {
        match self.target {
            Target::Echo => {
                let mut caller = EchoCaller::new(self.op_name.as_str())
                    .with_fail_every(self.echo.fail_every);
                if self.echo.delay_ms > 0 {
                    caller = caller.with_delay(Duration::from_millis(self.echo.delay_ms));
                }
                Ok(Arc::new(caller))
            }
            Target::Http => {
                let url = self
                    .url
                    .as_deref()
                    .context("the http target requires a url")?;
                let caller = HttpCaller::new(url, self.op_name.as_str())
                    .context("failed to set up http caller")?;
                Ok(Arc::new(caller))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_format() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "timeout_ms": 100,
                "rate": {"per_second": 10},
                "duration_ms": 1000,
                "target": "http",
                "url": "http://127.0.0.1:8090/op0"
            }"#,
        )
        .unwrap();

        assert_eq!(config.params.timeout, Duration::from_millis(100));
        assert_eq!(config.params.rate, Rate::PerSecond(10));
        assert_eq!(config.target, Target::Http);
        assert_eq!(config.op_name, "op0");
        assert_eq!(config.result_buffer, 10_000);
    }

    #[test]
    fn test_flags_override_file() {
        let config = RunConfig::default().merge(Overrides {
            timeout_ms: Some(250),
            rate: Some(20),
            duration_ms: Some(2000),
            buffer: Some(8),
            ..Default::default()
        });

        assert_eq!(config.params.timeout, Duration::from_millis(250));
        assert_eq!(config.params.rate, Rate::PerSecond(20));
        assert_eq!(config.params.duration, Duration::from_secs(2));
        assert_eq!(config.result_buffer, 8);
        assert_eq!(config.params.concurrency(), 6);
    }

    #[test]
    fn test_unrated_override() {
        let config = RunConfig::default().merge(Overrides {
            rate: Some(10),
            unrated: Some(16),
            ..Default::default()
        });

        assert_eq!(config.params.rate, Rate::Unrated);
        assert_eq!(config.params.concurrency(), 16);
    }

    #[test]
    fn test_defaults_fail_validation() {
        let errors = RunConfig::default().params.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_http_target_requires_url() {
        let config = RunConfig {
            target: Target::Http,
            ..Default::default()
        };
        let err = config.build_caller().err().unwrap();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_echo_caller_is_built() {
        let caller = RunConfig::default().build_caller().unwrap();
        assert_eq!(caller.name(), "echo");
    }
}
