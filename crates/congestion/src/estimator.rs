//! EWMA congestion estimator.

use crate::CongestionConfig;
use ferry_messages::CongestionReport;
use ferry_types::{CongestionSample, TrafficCounters};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Congestion value of one node.
///
/// Counters only grow between recomputes and are reset together with each
/// recompute, so the value always reflects exactly one interval's traffic.
#[derive(Debug, Clone)]
pub struct CongestionEstimator {
    config: CongestionConfig,

    /// Latest smoothed value.
    value: f64,

    /// Time of the last recompute.
    last_update: Duration,

    /// Local tallies since the last recompute.
    counters: TrafficCounters,

    /// Peer tallies folded in since the last recompute.
    peer_counters: TrafficCounters,

    /// Every recomputed value, oldest first.
    history: VecDeque<CongestionSample>,
}

impl CongestionEstimator {
    /// Create an estimator with value 0 and no history.
    pub fn new(config: CongestionConfig) -> Self {
        Self {
            config,
            value: 0.0,
            last_update: Duration::ZERO,
            counters: TrafficCounters::default(),
            peer_counters: TrafficCounters::default(),
            history: VecDeque::new(),
        }
    }

    /// Tally a dropped message.
    pub fn record_drop(&mut self) {
        self.counters.drops += 1;
    }

    /// Tally a message received from a peer.
    pub fn record_received(&mut self) {
        self.counters.received += 1;
    }

    /// Tally a locally generated message.
    pub fn record_generated(&mut self) {
        self.counters.generated += 1;
    }

    /// Accumulate counters a peer reported at link-down.
    ///
    /// Ignored unless `fold_peer_counters` is enabled. Returns whether the
    /// counters were taken.
    pub fn absorb_peer_counters(&mut self, counters: TrafficCounters) -> bool {
        if !self.config.fold_peer_counters {
            return false;
        }
        self.peer_counters += counters;
        true
    }

    /// Recompute the value if a full interval has passed since the last one.
    ///
    /// Returns the new value when a recompute happened. With no intake in the
    /// interval the previous value is carried over unchanged.
    pub fn recompute(&mut self, now: Duration) -> Option<f64> {
        let elapsed = now.checked_sub(self.last_update)?;
        if elapsed < self.config.update_interval() {
            return None;
        }

        let mut tally = self.counters;
        if self.config.fold_peer_counters {
            tally += self.peer_counters;
        }

        let intake = tally.intake();
        if intake > 0 {
            let ratio = tally.drops as f64 / intake as f64;
            self.value = self.config.alpha * ratio + (1.0 - self.config.alpha) * self.value;
        }

        self.push_sample(CongestionSample {
            value: self.value,
            at: now,
        });
        self.last_update = now;
        self.counters = TrafficCounters::default();
        self.peer_counters = TrafficCounters::default();

        debug!(
            drops = tally.drops,
            received = tally.received,
            generated = tally.generated,
            value = self.value,
            "Congestion recomputed"
        );
        Some(self.value)
    }

    fn push_sample(&mut self, sample: CongestionSample) {
        self.history.push_back(sample);
        if let Some(limit) = self.config.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Latest value, without recomputing.
    pub fn current_value(&self) -> f64 {
        self.value
    }

    /// All retained samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CongestionSample> {
        self.history.iter()
    }

    /// Most recent sample, if any.
    pub fn latest_sample(&self) -> Option<CongestionSample> {
        self.history.back().copied()
    }

    /// Local counters since the last recompute.
    pub fn counters(&self) -> TrafficCounters {
        self.counters
    }

    /// Time of the last recompute.
    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    /// What peers see of this estimator.
    pub fn report(&self) -> CongestionReport {
        CongestionReport {
            value: self.value,
            latest: self.latest_sample(),
            counters: self.counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn tally(est: &mut CongestionEstimator, drops: u64, received: u64, generated: u64) {
        for _ in 0..drops {
            est.record_drop();
        }
        for _ in 0..received {
            est.record_received();
        }
        for _ in 0..generated {
            est.record_generated();
        }
    }

    #[test]
    fn test_first_recompute() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        tally(&mut est, 3, 5, 2);

        let value = est.recompute(secs(500)).unwrap();
        assert!((value - 0.5 * 3.0 / 7.0).abs() < 1e-12);
        assert!((value - 0.2142857).abs() < 1e-6);
        assert!(est.counters().is_empty());
        assert_eq!(est.history().count(), 1);
        assert_eq!(est.latest_sample().map(|s| s.at), Some(secs(500)));
    }

    #[test]
    fn test_recompute_waits_for_interval() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        tally(&mut est, 1, 1, 0);

        assert_eq!(est.recompute(secs(499)), None);
        assert_eq!(est.counters().drops, 1);
        assert!(est.recompute(secs(500)).is_some());
        assert_eq!(est.recompute(secs(999)), None);
        assert!(est.recompute(secs(1000)).is_some());
    }

    #[test]
    fn test_zero_intake_holds_value_exactly() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        tally(&mut est, 2, 3, 0);
        let before = est.recompute(secs(500)).unwrap();

        // Drops without intake still leave the value untouched.
        est.record_drop();
        let after = est.recompute(secs(1000)).unwrap();
        assert_eq!(before, after);
        assert!(after.is_finite());
        assert_eq!(est.history().count(), 2);
    }

    #[test]
    fn test_ewma_smoothing() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        tally(&mut est, 4, 4, 0);
        assert_eq!(est.recompute(secs(500)), Some(0.5));
        tally(&mut est, 0, 10, 0);
        assert_eq!(est.recompute(secs(1000)), Some(0.25));
    }

    #[test]
    fn test_peer_counters_ignored_by_default() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        let peer = TrafficCounters {
            drops: 10,
            received: 10,
            generated: 0,
        };
        assert!(!est.absorb_peer_counters(peer));
        assert_eq!(est.recompute(secs(500)), Some(0.0));
    }

    #[test]
    fn test_peer_counters_folded_when_enabled() {
        let mut est = CongestionEstimator::new(CongestionConfig::default().with_peer_counters());
        tally(&mut est, 1, 3, 0);
        let peer = TrafficCounters {
            drops: 3,
            received: 2,
            generated: 3,
        };
        assert!(est.absorb_peer_counters(peer));

        // (1 + 3) / (3 + 5) = 0.5, halved by alpha.
        assert_eq!(est.recompute(secs(500)), Some(0.25));

        // Peer tallies are consumed by the recompute.
        tally(&mut est, 0, 1, 0);
        assert_eq!(est.recompute(secs(1000)), Some(0.125));
    }

    #[test]
    fn test_history_limit() {
        let mut est = CongestionEstimator::new(CongestionConfig::default().with_history_limit(2));
        for i in 1..=4 {
            est.recompute(secs(500 * i));
        }
        let times: Vec<_> = est.history().map(|s| s.at).collect();
        assert_eq!(times, vec![secs(1500), secs(2000)]);
    }

    #[test]
    fn test_report() {
        let mut est = CongestionEstimator::new(CongestionConfig::default());
        tally(&mut est, 1, 1, 0);
        est.recompute(secs(500));
        est.record_received();

        let report = est.report();
        assert_eq!(report.value, est.current_value());
        assert_eq!(report.latest, est.latest_sample());
        assert_eq!(report.counters.received, 1);
    }
}
