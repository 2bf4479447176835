//! Node configuration.

use ferry_congestion::CongestionConfig;
use ferry_forwarding::ForwardingConfig;
use ferry_predictability::PredictabilityConfig;
use ferry_replication::ReplicationConfig;
use ferry_types::ConfigError;
use serde::{Deserialize, Serialize};

/// Default buffer capacity: 5 MB.
pub const DEFAULT_BUFFER_CAPACITY: u64 = 5_000_000;

/// Everything needed to build a [`NodeStateMachine`](crate::NodeStateMachine).
///
/// All nodes of one experiment normally share a config; variants of the
/// routing scheme differ only in these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub predictability: PredictabilityConfig,
    pub congestion: CongestionConfig,
    pub replication: ReplicationConfig,
    pub forwarding: ForwardingConfig,

    /// Buffer capacity in bytes.
    pub buffer_capacity: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            predictability: PredictabilityConfig::default(),
            congestion: CongestionConfig::default(),
            replication: ReplicationConfig::default(),
            forwarding: ForwardingConfig::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl NodeConfig {
    /// Override the buffer capacity.
    pub fn with_buffer_capacity(mut self, bytes: u64) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    /// Enable replica control with `copies` initial copies.
    pub fn with_initial_copies(mut self, copies: u32) -> Self {
        self.replication.initial_copies = Some(copies);
        self
    }

    /// Override the congestion settings.
    pub fn with_congestion(mut self, congestion: CongestionConfig) -> Self {
        self.congestion = congestion;
        self
    }

    /// Override the forwarding settings.
    pub fn with_forwarding(mut self, forwarding: ForwardingConfig) -> Self {
        self.forwarding = forwarding;
        self
    }

    /// Override the predictability constants.
    pub fn with_predictability(mut self, predictability: PredictabilityConfig) -> Self {
        self.predictability = predictability;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.predictability.validate()?;
        self.congestion.validate()?;
        self.replication.validate()?;
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Missing("buffer_capacity"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity, 5_000_000);
        assert_eq!(config.replication.initial_copies, None);
        assert!(config.forwarding.delete_delivered);
    }

    #[test]
    fn test_validation_reaches_every_section() {
        assert_eq!(
            NodeConfig::default().with_buffer_capacity(0).validate(),
            Err(ConfigError::Missing("buffer_capacity"))
        );
        assert!(NodeConfig::default()
            .with_initial_copies(0)
            .validate()
            .is_err());

        let mut config = NodeConfig::default();
        config.congestion.update_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.predictability.p_init = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_json() {
        let config: NodeConfig = serde_json::from_str(
            r#"{
                "congestion": {"alpha": 0.25, "fold_peer_counters": true},
                "replication": {"initial_copies": 6},
                "forwarding": {"queue_mode": {"random": {"seed": 3}}},
                "buffer_capacity": 1000
            }"#,
        )
        .unwrap();
        assert_eq!(config.congestion.alpha, 0.25);
        assert!(config.congestion.fold_peer_counters);
        assert_eq!(config.congestion.update_interval_secs, 500);
        assert_eq!(config.replication.initial_copies, Some(6));
        assert_eq!(config.buffer_capacity, 1000);
        assert!(config.validate().is_ok());
    }
}
