//! Periodic pacing for call dispatch

use crate::config::Rate;

use tokio::time::{self, Interval, MissedTickBehavior};

/// Ticker that releases one dispatch per inter-call interval
///
/// The first tick fires immediately. A loop that falls behind gets a single
/// late tick and then realigns to the initial schedule, so slow dispatch
/// never turns into a burst. Unrated pacing only yields to the scheduler;
/// the ticket pool is what bounds it.
pub(crate) struct Pacer {
    interval: Option<Interval>,
    rate: Rate,
}

impl Pacer {
    /// Must be called from within a tokio runtime
    pub(crate) fn new(rate: Rate) -> Self {
        let interval = rate.interval().map(|period| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        Self { interval, rate }
    }

    /// Wait until the next call may be dispatched
    pub(crate) async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }

    /// Check if pacing is enabled
    pub(crate) fn is_rated(&self) -> bool {
        self.interval.is_some()
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("rate", &self.rate)
            .field("period", &self.interval.as_ref().map(Interval::period))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_pacer_unrated() {
        let mut pacer = Pacer::new(Rate::Unrated);
        assert!(!pacer.is_rated());
        // Should return immediately
        pacer.tick().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_first_tick_is_immediate() {
        let mut pacer = Pacer::new(Rate::PerSecond(10));
        assert!(pacer.is_rated());

        let start = Instant::now();
        pacer.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spacing() {
        let mut pacer = Pacer::new(Rate::PerSecond(4));
        let start = Instant::now();

        for _ in 0..5 {
            pacer.tick().await;
        }
        // Ticks at 0, 250, 500, 750, 1000ms
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_skips_missed_ticks() {
        let mut pacer = Pacer::new(Rate::PerSecond(10));
        let start = Instant::now();
        pacer.tick().await;

        // Fall three periods behind
        time::sleep(Duration::from_millis(350)).await;

        // One late tick, no burst
        pacer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(350));
        pacer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_pacer_debug() {
        let pacer = Pacer::new(Rate::PerSecond(100));
        let debug = format!("{:?}", pacer);
        assert!(debug.contains("Pacer"));
        assert!(debug.contains("10ms"));
    }
}
