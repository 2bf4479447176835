//! Combined node state machine.
//!
//! This crate composes the predictability table, congestion estimator,
//! receipt ledger, message buffer, replica control and forwarding scheduler
//! into one routing node.

mod config;
mod state;
mod stats;

pub use config::NodeConfig;
pub use state::NodeStateMachine;
pub use stats::NodeStats;
