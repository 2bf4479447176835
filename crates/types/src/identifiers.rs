//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier.
///
/// Identifies a simulated host. Nodes are compared and ordered by their raw
/// index so that every map keyed by `NodeId` iterates deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the raw index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Message identifier.
///
/// Unique across the network for the lifetime of a simulation. Every copy of
/// a message (original and replicas) shares the same id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Contact identifier.
///
/// Assigned by the host when a link comes up. Both endpoints of a link see
/// the same id; a later contact between the same pair gets a fresh id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(pub u64);

impl ContactId {
    /// Get the next contact id.
    pub fn next(self) -> Self {
        ContactId(self.0 + 1)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contact({})", self.0)
    }
}

/// Remaining number of copies a message may still spread.
///
/// Never below one: the copy a node holds always counts itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "u32", into = "u32")]
pub struct ReplicaCount(u32);

impl ReplicaCount {
    /// A single copy; the message may no longer be spread.
    pub const SINGLE: Self = ReplicaCount(1);

    /// Create from u32, ensuring it's at least 1.
    pub fn new(copies: u32) -> Self {
        ReplicaCount(copies.max(1))
    }

    /// Get the raw value.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Floor-halve the count, never dropping below one.
    pub fn halved(self) -> Self {
        ReplicaCount::new(self.0 / 2)
    }

    /// Remove exactly one copy, never dropping below one.
    pub fn decremented(self) -> Self {
        ReplicaCount::new(self.0.saturating_sub(1))
    }

    /// Whether more than one copy remains, i.e. the holder may still spread it.
    pub fn can_spread(&self) -> bool {
        self.0 > 1
    }
}

impl Default for ReplicaCount {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl From<u32> for ReplicaCount {
    fn from(copies: u32) -> Self {
        ReplicaCount::new(copies)
    }
}

impl From<ReplicaCount> for u32 {
    fn from(copies: ReplicaCount) -> Self {
        copies.0
    }
}

impl fmt::Display for ReplicaCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_count_floor() {
        assert_eq!(ReplicaCount::new(0), ReplicaCount::SINGLE);
        assert_eq!(ReplicaCount::new(1).halved(), ReplicaCount::SINGLE);
        assert_eq!(ReplicaCount::new(1).decremented(), ReplicaCount::SINGLE);
    }

    #[test]
    fn test_replica_count_halving_floors() {
        assert_eq!(ReplicaCount::new(8).halved().get(), 4);
        assert_eq!(ReplicaCount::new(7).halved().get(), 3);
        assert_eq!(ReplicaCount::new(3).halved().get(), 1);
    }

    #[test]
    fn test_replica_count_never_below_one() {
        let mut copies = ReplicaCount::new(16);
        for _ in 0..40 {
            copies = copies.halved().decremented();
            assert!(copies.get() >= 1);
        }
        assert!(!copies.can_spread());
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId(3).to_string(), "Node(3)");
        assert_eq!(MessageId(12).to_string(), "M12");
        assert_eq!(ContactId(7).next().to_string(), "Contact(8)");
    }
}
