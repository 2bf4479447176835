//! Configuration for replica control.

use ferry_types::{CongestionThresholds, ConfigError};
use serde::{Deserialize, Serialize};

/// Replica control settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Copies a newly generated message starts with.
    ///
    /// `None` disables replica control: messages carry no count and are
    /// forwarded purely on predictability.
    pub initial_copies: Option<u32>,

    /// Bands the receiving peer's congestion value is read against.
    pub thresholds: CongestionThresholds,
}

impl ReplicationConfig {
    /// Config with replica control enabled at `copies` initial copies.
    pub fn with_initial_copies(copies: u32) -> Self {
        Self {
            initial_copies: Some(copies),
            ..Default::default()
        }
    }

    /// Override the congestion thresholds.
    pub fn with_thresholds(mut self, thresholds: CongestionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_copies == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "replication.initial_copies",
                value: 0.0,
                expected: "at least 1 when set",
            });
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_replication() {
        let config = ReplicationConfig::default();
        assert_eq!(config.initial_copies, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_copies_rejected() {
        assert!(ReplicationConfig::with_initial_copies(0).validate().is_err());
        assert!(ReplicationConfig::with_initial_copies(1).validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_thresholds() {
        let config: ReplicationConfig = serde_json::from_str(
            r#"{"initial_copies": 8, "thresholds": {"moderate": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.initial_copies, Some(8));
        assert_eq!(config.thresholds.moderate, 0.5);
        assert_eq!(config.thresholds.overload, 1.0);
    }
}
