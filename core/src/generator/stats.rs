//! Dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters of a load generator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStats {
    /// Calls dispatched by the pacing loop
    pub dispatched: u64,

    /// Outcomes accepted by the result channel
    pub delivered: u64,

    /// Outcomes dropped (full channel or stopped generator)
    pub dropped: u64,

    /// Call tasks currently holding a ticket
    pub in_flight: u32,
}

impl GeneratorStats {
    /// Outcomes produced so far, delivered or not
    pub fn resolved(&self) -> u64 {
        self.delivered + self.dropped
    }

    /// Fraction of resolved outcomes that were dropped (0.0 - 1.0)
    pub fn drop_rate(&self) -> f64 {
        let resolved = self.resolved();
        if resolved == 0 {
            0.0
        } else {
            self.dropped as f64 / resolved as f64
        }
    }
}

/// Counters shared by the pacing loop and all call tasks
#[derive(Debug, Default)]
pub(crate) struct Counters {
    dispatched: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn record_dispatch(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self, in_flight: u32) -> GeneratorStats {
        GeneratorStats {
            dispatched: self.dispatched(),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_stats_defaults() {
        let stats = GeneratorStats::default();
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.resolved(), 0);
        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn test_generator_stats_drop_rate() {
        let stats = GeneratorStats {
            dispatched: 10,
            delivered: 8,
            dropped: 2,
            in_flight: 0,
        };
        assert_eq!(stats.resolved(), 10);
        assert!((stats.drop_rate() - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        assert_eq!(counters.record_dispatch(), 1);
        assert_eq!(counters.record_dispatch(), 2);
        counters.record_delivered();
        counters.record_dropped();

        let stats = counters.snapshot(1);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.in_flight, 1);
    }
}
