//! Congestion thresholds, samples, and traffic counters.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::Duration;

/// Band a congestion value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CongestionBand {
    /// Value is zero (or below): no evidence of congestion.
    Clear,
    /// `0 < value <= moderate`.
    Moderate,
    /// `moderate < value <= overload`.
    Heavy,
    /// `value > overload`: the node is shedding more than it takes in.
    Overloaded,
}

/// Threshold pair interpreting a congestion value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionThresholds {
    /// Upper bound of the moderate band.
    pub moderate: f64,
    /// Upper bound of the heavy band; anything above is an overload.
    pub overload: f64,
}

impl Default for CongestionThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.7,
            overload: 1.0,
        }
    }
}

impl CongestionThresholds {
    /// Create a threshold pair.
    pub fn new(moderate: f64, overload: f64) -> Self {
        Self { moderate, overload }
    }

    /// Classify a congestion value.
    pub fn classify(&self, value: f64) -> CongestionBand {
        if value > self.overload {
            CongestionBand::Overloaded
        } else if value > self.moderate {
            CongestionBand::Heavy
        } else if value > 0.0 {
            CongestionBand::Moderate
        } else {
            CongestionBand::Clear
        }
    }

    /// Check if a value signals overload.
    pub fn is_overloaded(&self, value: f64) -> bool {
        self.classify(value) == CongestionBand::Overloaded
    }

    /// Validate the pair: `0 < moderate <= overload`, both finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.moderate.is_finite() && self.moderate > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "thresholds.moderate",
                value: self.moderate,
                expected: "a finite value > 0",
            });
        }
        if !(self.overload.is_finite() && self.overload >= self.moderate) {
            return Err(ConfigError::OutOfRange {
                field: "thresholds.overload",
                value: self.overload,
                expected: "a finite value >= thresholds.moderate",
            });
        }
        Ok(())
    }
}

/// A recomputed congestion value and when it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CongestionSample {
    /// Smoothed congestion value.
    pub value: f64,
    /// Simulated time of the recompute.
    pub at: Duration,
}

/// Local traffic tallies feeding the congestion estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    /// Messages dropped from the buffer (evictions and rejected admissions).
    pub drops: u64,
    /// Messages received from peers.
    pub received: u64,
    /// Messages generated locally.
    pub generated: u64,
}

impl TrafficCounters {
    /// Messages taken in, the congestion ratio's denominator.
    pub fn intake(&self) -> u64 {
        self.received + self.generated
    }

    /// Check if nothing has been tallied.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for TrafficCounters {
    fn add_assign(&mut self, other: Self) {
        self.drops += other.drops;
        self.received += other.received;
        self.generated += other.generated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let t = CongestionThresholds::default();
        assert_eq!(t.classify(0.0), CongestionBand::Clear);
        assert_eq!(t.classify(0.0001), CongestionBand::Moderate);
        assert_eq!(t.classify(0.7), CongestionBand::Moderate);
        assert_eq!(t.classify(0.7001), CongestionBand::Heavy);
        assert_eq!(t.classify(1.0), CongestionBand::Heavy);
        assert_eq!(t.classify(1.0001), CongestionBand::Overloaded);
        assert!(t.is_overloaded(3.0));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(CongestionThresholds::default().validate().is_ok());
        assert!(CongestionThresholds::new(0.0, 1.0).validate().is_err());
        assert!(CongestionThresholds::new(0.8, 0.5).validate().is_err());
        assert!(CongestionThresholds::new(0.5, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_counters_accumulate() {
        let mut total = TrafficCounters::default();
        assert!(total.is_empty());
        total += TrafficCounters {
            drops: 1,
            received: 2,
            generated: 3,
        };
        total += TrafficCounters {
            drops: 1,
            received: 0,
            generated: 1,
        };
        assert_eq!(total.drops, 2);
        assert_eq!(total.intake(), 6);
    }
}
