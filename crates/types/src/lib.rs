//! Core types for the Ferry opportunistic routing engine.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - [`NodeId`], [`MessageId`], [`ContactId`]: identifiers
//! - [`Message`] with its [`MessageProperties`] bag and [`ReplicaCount`]
//! - [`CongestionThresholds`], [`CongestionSample`], [`TrafficCounters`]
//! - [`ConfigError`]: shared configuration validation error

mod congestion;
mod error;
mod identifiers;
mod message;

pub use congestion::{CongestionBand, CongestionSample, CongestionThresholds, TrafficCounters};
pub use error::ConfigError;
pub use identifiers::{ContactId, MessageId, NodeId, ReplicaCount};
pub use message::{Message, MessageProperties, PropertyValue, REPLICAS_PROPERTY};
