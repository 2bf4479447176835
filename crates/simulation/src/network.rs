//! Simulated link layer settings.

use ferry_node::NodeConfig;
use ferry_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the simulated network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of nodes. Node ids are `0..num_nodes`.
    pub num_nodes: u32,

    /// Link bandwidth in bytes per second, per direction.
    pub bandwidth: u64,

    /// Interval between node ticks, in milliseconds.
    pub tick_interval_ms: u64,

    /// Routing settings shared by every node.
    pub node: NodeConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            bandwidth: 250_000,
            tick_interval_ms: 1_000,
            node: NodeConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// A network of `num_nodes` with default settings.
    pub fn with_nodes(num_nodes: u32) -> Self {
        Self {
            num_nodes,
            ..Self::default()
        }
    }

    /// Override the link bandwidth (bytes per second).
    pub fn with_bandwidth(mut self, bandwidth: u64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Override the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the node settings.
    pub fn with_node_config(mut self, node: NodeConfig) -> Self {
        self.node = node;
        self
    }

    /// Interval between node ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Time to push `size` bytes over one link direction.
    pub fn transfer_time(&self, size: u64) -> Duration {
        let bandwidth = u128::from(self.bandwidth.max(1));
        let nanos = u128::from(size) * 1_000_000_000 / bandwidth;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Validate the network and node settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes == 0 {
            return Err(ConfigError::Missing("num_nodes"));
        }
        if self.bandwidth == 0 {
            return Err(ConfigError::Missing("bandwidth"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Missing("tick_interval_ms"));
        }
        self.node.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_time() {
        let config = NetworkConfig::default().with_bandwidth(1_000);
        assert_eq!(config.transfer_time(500), Duration::from_millis(500));
        assert_eq!(config.transfer_time(0), Duration::ZERO);
        assert_eq!(config.transfer_time(3_000), Duration::from_secs(3));
    }

    #[test]
    fn test_validate() {
        assert!(NetworkConfig::default().validate().is_ok());
        assert_eq!(
            NetworkConfig::with_nodes(0).validate(),
            Err(ConfigError::Missing("num_nodes"))
        );
        assert_eq!(
            NetworkConfig::default().with_bandwidth(0).validate(),
            Err(ConfigError::Missing("bandwidth"))
        );
        let bad_node = NodeConfig::default().with_buffer_capacity(0);
        assert!(NetworkConfig::default()
            .with_node_config(bad_node)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_from_json() {
        let config: NetworkConfig = serde_json::from_str(
            r#"{"num_nodes": 4, "tick_interval_ms": 250, "node": {"buffer_capacity": 2000}}"#,
        )
        .unwrap();
        assert_eq!(config.num_nodes, 4);
        assert_eq!(config.bandwidth, 250_000);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.node.buffer_capacity, 2000);
    }
}
