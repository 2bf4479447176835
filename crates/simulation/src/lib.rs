//! Deterministic simulation runner.
//!
//! This crate plays the host for a set of routing nodes: it opens and closes
//! links according to a contact plan, moves bytes over them at a fixed
//! bandwidth and feeds every result back to the nodes as events. Given the
//! same plan and workload, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, HostEvent>)    │ │
//! │  │     Ordered by: time, priority, node, sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: Vec<NodeStateMachine>                   │ │
//! │  │     links: BTreeMap<ContactId, Link>               │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → transfers, aborts, statistics        │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod contact_plan;
mod error;
mod event_queue;
mod network;
mod runner;

pub use contact_plan::{ContactPlan, ContactWindow, RandomContacts};
pub use error::SimulationError;
pub use event_queue::{EventKey, HostEvent};
pub use network::NetworkConfig;
pub use runner::{SimulationRunner, SimulationStats};

/// Index of a simulated node.
///
/// Node `i` runs with `NodeId(i)`.
pub type NodeIndex = u32;
