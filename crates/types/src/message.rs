//! Routed message and its mutable routing metadata.

use crate::{MessageId, NodeId, ReplicaCount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Property key under which the remaining replica count is stored.
pub const REPLICAS_PROPERTY: &str = "ferry.copies";

/// A value in a message's property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl PropertyValue {
    /// Interpret the value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Open-ended key/value bag for engine-private metadata.
///
/// Keys are ordered so that serialized messages and debug output are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageProperties(BTreeMap<String, PropertyValue>);

impl MessageProperties {
    /// Create an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.0.insert(key.into(), value)
    }

    /// Remove a property.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    /// Check if a property is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A message carried through the network.
///
/// The identity fields (`id`, `source`, `destination`, `size`, `created_at`,
/// `ttl`) never change after creation. Routing metadata (`hop_count`,
/// `received_at`, `properties`) is owned by whichever node holds the copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Network-wide message id.
    pub id: MessageId,
    /// Node that generated the message.
    pub source: NodeId,
    /// Final destination.
    pub destination: NodeId,
    /// Payload size in bytes.
    pub size: u64,
    /// Simulated time of generation.
    pub created_at: Duration,
    /// Lifetime measured from `created_at`.
    pub ttl: Duration,
    /// Number of hops this copy has travelled.
    pub hop_count: u32,
    /// Simulated time this copy entered the current holder's buffer.
    pub received_at: Duration,
    /// Engine-private metadata.
    pub properties: MessageProperties,
}

impl Message {
    /// Create a freshly generated message at `now`.
    pub fn new(
        id: MessageId,
        source: NodeId,
        destination: NodeId,
        size: u64,
        ttl: Duration,
        now: Duration,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            size,
            created_at: now,
            ttl,
            hop_count: 0,
            received_at: now,
            properties: MessageProperties::new(),
        }
    }

    /// Absolute simulated time at which this message expires.
    pub fn expires_at(&self) -> Duration {
        self.created_at.saturating_add(self.ttl)
    }

    /// Lifetime left at `now` (zero once expired).
    pub fn remaining_ttl(&self, now: Duration) -> Duration {
        self.expires_at().saturating_sub(now)
    }

    /// Check if the message's lifetime has run out.
    pub fn is_expired(&self, now: Duration) -> bool {
        self.remaining_ttl(now).is_zero()
    }

    /// Check if `node` is the final destination.
    pub fn is_destined_for(&self, node: NodeId) -> bool {
        self.destination == node
    }

    /// Remaining replica count, if this message is replica-governed.
    pub fn replicas(&self) -> Option<ReplicaCount> {
        self.properties
            .get(REPLICAS_PROPERTY)
            .and_then(PropertyValue::as_int)
            .map(|copies| ReplicaCount::new(u32::try_from(copies.max(1)).unwrap_or(u32::MAX)))
    }

    /// Store the remaining replica count.
    pub fn set_replicas(&mut self, copies: ReplicaCount) {
        self.properties.insert(
            REPLICAS_PROPERTY,
            PropertyValue::Int(i64::from(copies.get())),
        );
    }

    /// The copy a peer receives: one more hop, arrival stamped at `now`.
    pub fn forwarded(&self, now: Duration) -> Self {
        Self {
            hop_count: self.hop_count + 1,
            received_at: now,
            ..self.clone()
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {}, {}B)",
            self.id, self.source, self.destination, self.size
        )
    }
}
