//! Configuration types for the simulator.

use ferry_node::NodeConfig;
use ferry_simulation::{NetworkConfig, RandomContacts};
use ferry_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Network and per-node routing settings.
    pub network: NetworkConfig,

    /// How often and how long pairs of nodes meet.
    pub contacts: RandomContacts,

    /// Workload configuration.
    pub workload: WorkloadConfig,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(num_nodes: u32) -> Self {
        Self {
            network: NetworkConfig::with_nodes(num_nodes),
            contacts: RandomContacts::default(),
            workload: WorkloadConfig::default(),
            seed: 12345,
        }
    }

    /// Set the routing settings of every node.
    pub fn with_node_config(mut self, node: NodeConfig) -> Self {
        self.network.node = node;
        self
    }

    /// Set the link bandwidth (bytes per second).
    pub fn with_bandwidth(mut self, bandwidth: u64) -> Self {
        self.network.bandwidth = bandwidth;
        self
    }

    /// Set the contact plan parameters.
    pub fn with_contacts(mut self, contacts: RandomContacts) -> Self {
        self.contacts = contacts;
        self
    }

    /// Set the workload configuration.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of simulated nodes.
    pub fn num_nodes(&self) -> u32 {
        self.network.num_nodes
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.workload.validate()?;
        if self.network.num_nodes < 2 {
            return Err(ConfigError::OutOfRange {
                field: "num_nodes",
                value: f64::from(self.network.num_nodes),
                expected: "at least 2",
            });
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Message generation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Shortest gap between two generated messages, in seconds.
    pub min_interval_secs: u64,

    /// Longest gap between two generated messages, in seconds.
    pub max_interval_secs: u64,

    /// Smallest message, in bytes.
    pub min_size: u64,

    /// Largest message, in bytes.
    pub max_size: u64,

    /// Lifetime of every generated message, in seconds.
    pub ttl_secs: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 25,
            max_interval_secs: 35,
            min_size: 50_000,
            max_size: 100_000,
            ttl_secs: 5 * 3_600,
        }
    }
}

impl WorkloadConfig {
    /// Set the gap range between messages.
    pub fn with_interval(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval_secs = min.as_secs();
        self.max_interval_secs = max.as_secs();
        self
    }

    /// Set the size range of messages.
    pub fn with_sizes(mut self, min: u64, max: u64) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set the message lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    /// Message lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_interval_secs == 0 {
            return Err(ConfigError::Missing("max_interval_secs"));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(ConfigError::OutOfRange {
                field: "min_interval_secs",
                value: self.min_interval_secs as f64,
                expected: "at most max_interval_secs",
            });
        }
        if self.min_size == 0 {
            return Err(ConfigError::Missing("min_size"));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::OutOfRange {
                field: "min_size",
                value: self.min_size as f64,
                expected: "at most max_size",
            });
        }
        if self.ttl_secs == 0 {
            return Err(ConfigError::Missing("ttl_secs"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_nodes(), 10);
        assert_eq!(config.workload.ttl(), Duration::from_secs(18_000));
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(SimulatorConfig::new(1).validate().is_err());
        let workload = WorkloadConfig::default().with_sizes(10, 5);
        assert!(workload.validate().is_err());
        let workload =
            WorkloadConfig::default().with_interval(Duration::from_secs(9), Duration::from_secs(3));
        assert!(workload.validate().is_err());
        assert!(WorkloadConfig::default()
            .with_ttl(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_from_json() {
        let config: SimulatorConfig = serde_json::from_str(
            r#"{
                "network": {"num_nodes": 4, "node": {"replication": {"initial_copies": 6}}},
                "workload": {"min_size": 10, "max_size": 20},
                "seed": 9
            }"#,
        )
        .unwrap();
        assert_eq!(config.num_nodes(), 4);
        assert_eq!(config.network.node.replication.initial_copies, Some(6));
        assert_eq!(config.workload.max_size, 20);
        assert_eq!(config.workload.ttl_secs, 18_000);
        assert_eq!(config.seed, 9);
        assert!(config.validate().is_ok());
    }
}
