//! Outcome aggregation and reporting

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use yload_core::{CallOutcome, GeneratorStats, ParamSet, RetCode};

/// Latency percentiles (all values in milliseconds)
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct LatencyPercentiles {
    /// Minimum value
    pub min: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub mean: f64,
}

/// HdrHistogram of call latencies with microsecond precision, max 1 hour
pub struct LatencyHistogram {
    histogram: hdrhistogram::Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Result<Self> {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000_000, 3)
            .context("failed to create latency histogram")?;
        Ok(Self { histogram })
    }

    /// Record a duration, saturating at the histogram bounds
    pub fn record(&mut self, duration: Duration) {
        let micros = duration.as_micros().min(u128::from(u64::MAX)) as u64;
        self.histogram.saturating_record(micros.max(1));
    }

    pub fn recorded(&self) -> u64 {
        self.histogram.len()
    }

    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.histogram.is_empty() {
            return LatencyPercentiles::default();
        }

        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyPercentiles {
            min: ms(self.histogram.min()),
            p50: ms(self.histogram.value_at_quantile(0.50)),
            p90: ms(self.histogram.value_at_quantile(0.90)),
            p95: ms(self.histogram.value_at_quantile(0.95)),
            p99: ms(self.histogram.value_at_quantile(0.99)),
            max: ms(self.histogram.max()),
            mean: self.histogram.mean() / 1000.0,
        }
    }
}

/// One outcome as a JSON line
#[derive(Debug, Serialize)]
pub struct OutcomeLine<'a> {
    pub timestamp: DateTime<Utc>,
    pub id: Option<u64>,
    pub code: RetCode,
    pub code_num: u16,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "is_blank")]
    pub message: &'a str,
}

fn is_blank(message: &&str) -> bool {
    message.is_empty()
}

impl<'a> From<&'a CallOutcome> for OutcomeLine<'a> {
    fn from(outcome: &'a CallOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            id: outcome.id.map(|id| id.0),
            code: outcome.code,
            code_num: outcome.code.code(),
            elapsed_ms: outcome.elapsed.as_secs_f64() * 1000.0,
            message: &outcome.message,
        }
    }
}

/// Running tally of delivered outcomes
pub struct Summary {
    counts: HashMap<RetCode, u64>,
    latency: LatencyHistogram,
    started_at: DateTime<Utc>,
}

impl Summary {
    pub fn new() -> Result<Self> {
        Ok(Self {
            counts: HashMap::new(),
            latency: LatencyHistogram::new()?,
            started_at: Utc::now(),
        })
    }

    pub fn record(&mut self, outcome: &CallOutcome) {
        *self.counts.entry(outcome.code).or_insert(0) += 1;
        if outcome.is_success() {
            self.latency.record(outcome.elapsed);
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, code: RetCode) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Close the tally into a report
    pub fn finish(self, params: &ParamSet, elapsed: Duration, stats: GeneratorStats) -> RunReport {
        let total = self.total();
        let successes = self.count(RetCode::Success);
        let success_rate = if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64
        };
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        let counts = RetCode::ALL
            .iter()
            .map(|code| CodeCount {
                code: *code,
                code_num: code.code(),
                count: self.count(*code),
            })
            .filter(|c| c.count > 0)
            .collect();

        RunReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            rate: params.rate.to_string(),
            timeout_ms: params.timeout.as_millis() as u64,
            duration_ms: params.duration.as_millis() as u64,
            concurrency: params.concurrency(),
            elapsed_secs,
            dispatched: stats.dispatched,
            delivered: total,
            dropped: stats.dropped,
            counts,
            success_rate,
            throughput,
            latency_samples: self.latency.recorded(),
            latency_ms: self.latency.percentiles(),
        }
    }
}

/// Count of one result code
#[derive(Debug, Clone, Serialize)]
pub struct CodeCount {
    pub code: RetCode,
    pub code_num: u16,
    pub count: u64,
}

/// Final report of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rate: String,
    pub timeout_ms: u64,
    pub duration_ms: u64,
    pub concurrency: u32,
    pub elapsed_secs: f64,
    pub dispatched: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub counts: Vec<CodeCount>,
    pub success_rate: f64,
    pub throughput: f64,
    pub latency_samples: u64,
    pub latency_ms: LatencyPercentiles,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load generation finished")?;
        writeln!(
            f,
            "  rate {}  timeout {}ms  duration {}ms  concurrency {}",
            self.rate, self.timeout_ms, self.duration_ms, self.concurrency
        )?;
        writeln!(
            f,
            "  elapsed {:.2}s  dispatched {}  delivered {}  dropped {}",
            self.elapsed_secs, self.dispatched, self.delivered, self.dropped
        )?;
        writeln!(f, "  outcomes:")?;
        for c in &self.counts {
            writeln!(f, "    {:<24} {:>5}  {:>8}", c.code.to_string(), c.code_num, c.count)?;
        }
        writeln!(
            f,
            "  success rate {:.2}%  throughput {:.1}/s",
            self.success_rate * 100.0,
            self.throughput
        )?;
        let l = &self.latency_ms;
        write!(
            f,
            "  latency ms  min {:.2}  p50 {:.2}  p90 {:.2}  p95 {:.2}  p99 {:.2}  max {:.2}  mean {:.2}",
            l.min, l.p50, l.p90, l.p95, l.p99, l.max, l.mean
        )
    }
}
