//! Test fixtures for ferry.
//!
//! Builders for messages, peer snapshots and events so tests can set up a
//! contact in a couple of lines.

use ferry_core::Event;
use ferry_messages::{PeerSnapshot, Receipt};
use ferry_types::{ContactId, CongestionSample, Message, MessageId, NodeId, ReplicaCount};
use std::time::Duration;

/// Default lifetime of fixture messages.
pub const TEST_TTL: Duration = Duration::from_secs(3600);

/// Shorthand for whole seconds of simulated time.
pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

/// A message generated at time zero with [`TEST_TTL`].
pub fn test_message(id: u64, source: u32, destination: u32, size: u64) -> Message {
    message_at(id, source, destination, size, TEST_TTL, Duration::ZERO)
}

/// A message with explicit lifetime and creation time.
pub fn message_at(
    id: u64,
    source: u32,
    destination: u32,
    size: u64,
    ttl: Duration,
    created_at: Duration,
) -> Message {
    Message::new(
        MessageId(id),
        NodeId(source),
        NodeId(destination),
        size,
        ttl,
        created_at,
    )
}

/// A fixture message carrying a replica count.
pub fn replicated_message(id: u64, source: u32, destination: u32, copies: u32) -> Message {
    let mut message = test_message(id, source, destination, 100);
    message.set_replicas(ReplicaCount::new(copies));
    message
}

/// Builder for [`PeerSnapshot`]s.
#[derive(Debug, Clone)]
pub struct PeerBuilder {
    snapshot: PeerSnapshot,
}

impl PeerBuilder {
    /// Start from an empty snapshot of `node`.
    pub fn new(node: u32) -> Self {
        Self {
            snapshot: PeerSnapshot::new(NodeId(node)),
        }
    }

    /// The peer's predictability for `destination`.
    pub fn predictability(mut self, destination: u32, p: f64) -> Self {
        self.snapshot
            .predictability
            .entries
            .insert(NodeId(destination), p);
        self
    }

    /// The peer already buffers `id`.
    pub fn holding(mut self, id: u64) -> Self {
        self.snapshot.holdings.insert(MessageId(id));
        self
    }

    /// The peer's latest congestion value.
    pub fn congestion(mut self, value: f64, at: Duration) -> Self {
        self.snapshot.congestion.value = value;
        self.snapshot.congestion.latest = Some(CongestionSample { value, at });
        self
    }

    /// The peer knows `id` was delivered.
    pub fn receipt(mut self, id: u64, confirmed_at: Duration, residual_ttl: Duration) -> Self {
        self.snapshot.receipts.entries.insert(
            MessageId(id),
            Receipt {
                confirmed_at,
                residual_ttl,
            },
        );
        self
    }

    /// The peer is busy with another transfer.
    pub fn transferring(mut self) -> Self {
        self.snapshot.transferring = true;
        self
    }

    /// The peer speaks another protocol version.
    pub fn protocol(mut self, version: u16) -> Self {
        self.snapshot.protocol = version;
        self
    }

    /// Finish the snapshot.
    pub fn build(self) -> PeerSnapshot {
        self.snapshot
    }
}

/// A link-up event for `peer` on `contact`.
pub fn link_up(contact: u64, peer: PeerSnapshot) -> Event {
    Event::LinkUp {
        contact: ContactId(contact),
        peer: Box::new(peer),
    }
}

/// A peer refresh event for `peer` on `contact`.
pub fn peer_refreshed(contact: u64, peer: PeerSnapshot) -> Event {
    Event::PeerRefreshed {
        contact: ContactId(contact),
        peer: Box::new(peer),
    }
}
