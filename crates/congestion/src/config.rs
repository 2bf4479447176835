//! Configuration for the congestion estimator.

use ferry_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// EWMA constants and recompute cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionConfig {
    /// Weight of the newest ratio in the moving average.
    pub alpha: f64,

    /// Minimum simulated time between recomputes, in seconds.
    pub update_interval_secs: u64,

    /// Fold peer-reported counters into the ratio.
    ///
    /// When enabled, counters a peer reports at link-down join the local
    /// counters: peer drops in the numerator, peer intake in the denominator.
    pub fold_peer_counters: bool,

    /// Maximum number of samples kept in the history. `None` keeps all.
    pub history_limit: Option<usize>,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            update_interval_secs: 500,
            fold_peer_counters: false,
            history_limit: None,
        }
    }
}

impl CongestionConfig {
    /// Override the smoothing weight.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Override the recompute interval.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval_secs = interval.as_secs();
        self
    }

    /// Enable folding of peer counters.
    pub fn with_peer_counters(mut self) -> Self {
        self.fold_peer_counters = true;
        self
    }

    /// Cap the history length.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Recompute interval as a duration.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Validate the constants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "congestion.alpha",
                value: self.alpha,
                expected: "a value in (0, 1]",
            });
        }
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Missing("congestion.update_interval_secs"));
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "congestion.history_limit",
                value: 0.0,
                expected: "at least 1 when set",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CongestionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.update_interval(), Duration::from_secs(500));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(CongestionConfig::default()
            .with_alpha(0.0)
            .validate()
            .is_err());
        assert!(CongestionConfig::default()
            .with_alpha(1.5)
            .validate()
            .is_err());
        assert!(CongestionConfig::default()
            .with_update_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CongestionConfig::default()
            .with_history_limit(0)
            .validate()
            .is_err());
        assert!(CongestionConfig::default().with_alpha(1.0).validate().is_ok());
    }
}
