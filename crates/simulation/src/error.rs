//! Simulation setup errors.

use crate::NodeIndex;
use ferry_types::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors detected while building or feeding a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A node or network setting failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A contact or message refers to a node outside the network.
    #[error("node {node} does not exist (network has {num_nodes} nodes)")]
    UnknownNode { node: NodeIndex, num_nodes: u32 },

    /// A contact window connects a node to itself.
    #[error("node {0} cannot be in contact with itself")]
    SelfContact(NodeIndex),

    /// A contact window ends before it starts.
    #[error("contact {a}<->{b} at {start:?} has no duration")]
    EmptyWindow {
        a: NodeIndex,
        b: NodeIndex,
        start: Duration,
    },

    /// Two windows for the same pair overlap.
    #[error("contacts {a}<->{b} overlap at {at:?}")]
    OverlappingWindows {
        a: NodeIndex,
        b: NodeIndex,
        at: Duration,
    },

    /// A message was scheduled in the simulated past.
    #[error("cannot schedule at {at:?}, simulation is already at {now:?}")]
    InThePast { at: Duration, now: Duration },
}
