//! Configuration for the predictability table.

use ferry_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// PRoPHET constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictabilityConfig {
    /// Weight of a direct encounter.
    pub p_init: f64,

    /// Scaling of transitive updates.
    pub beta: f64,

    /// Aging factor applied once per time unit.
    pub gamma: f64,

    /// Length of one aging time unit, in seconds.
    pub seconds_in_time_unit: u64,
}

impl Default for PredictabilityConfig {
    fn default() -> Self {
        Self {
            p_init: 0.75,
            beta: 0.25,
            gamma: 0.98,
            seconds_in_time_unit: 30,
        }
    }
}

impl PredictabilityConfig {
    /// Override the transitivity scaling constant.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Override the aging constant.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Override the aging time unit.
    pub fn with_seconds_in_time_unit(mut self, seconds: u64) -> Self {
        self.seconds_in_time_unit = seconds;
        self
    }

    /// Aging time unit as a duration.
    pub fn time_unit(&self) -> Duration {
        Duration::from_secs(self.seconds_in_time_unit)
    }

    /// Validate the constants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_open_unit("predictability.p_init", self.p_init)?;
        ConfigError::check_open_unit("predictability.beta", self.beta)?;
        ConfigError::check_open_unit("predictability.gamma", self.gamma)?;
        if self.seconds_in_time_unit == 0 {
            return Err(ConfigError::Missing("predictability.seconds_in_time_unit"));
        }
        Ok(())
    }
}
