//! Event types for the deterministic state machine.

use ferry_messages::PeerSnapshot;
use ferry_types::{ContactId, Message, MessageId, TrafficCounters};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// Link teardown and transfer results at an instant are handled before that
/// instant's tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,

    /// Topology events: links coming up or going down.
    Topology = 1,

    /// Timer events: periodic ticks.
    Timer = 2,

    /// Client events: messages injected by the workload.
    Client = 3,
}

/// Result of asking a peer to accept a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOutcome {
    /// The transfer is on the wire.
    Started,
    /// The connection (or the peer) is already busy; retry on a later tick.
    Busy,
    /// The peer already knows the message was delivered.
    RejectedStale,
    /// The peer refused for any other reason (no room, duplicate, expired).
    RejectedOther,
}

impl TransferOutcome {
    /// Check if the peer refused the message outright.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TransferOutcome::RejectedStale | TransferOutcome::RejectedOther
        )
    }
}

/// All possible events a node can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Periodic tick: age, recompute congestion, expire, rank, transfer.
    Tick,

    // ═══════════════════════════════════════════════════════════════════════
    // Topology (priority: Topology)
    // ═══════════════════════════════════════════════════════════════════════
    /// A link to a peer came up. `peer` is the peer's state at link-up.
    LinkUp {
        contact: ContactId,
        peer: Box<PeerSnapshot>,
    },

    /// Fresh view of a peer on an open contact, delivered before each tick.
    PeerRefreshed {
        contact: ContactId,
        peer: Box<PeerSnapshot>,
    },

    /// A link went down. `peer_counters` are the peer's traffic counters at
    /// the moment of teardown.
    LinkDown {
        contact: ContactId,
        peer_counters: TrafficCounters,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Transfers (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// A message finished arriving over `contact`.
    MessageArrived { contact: ContactId, message: Message },

    /// The host's answer to an `Action::StartTransfer`.
    TransferOutcome {
        contact: ContactId,
        message: MessageId,
        outcome: TransferOutcome,
    },

    /// An outgoing transfer finished successfully.
    TransferCompleted {
        contact: ContactId,
        message: MessageId,
    },

    /// An outgoing transfer was cut short by the host while the link stayed
    /// up, for example a radio driver that drops a frame mid-bundle.
    ///
    /// Hosts that only lose transfers together with the link report that
    /// through [`Event::LinkDown`] and never send this. The simulation host
    /// is one of them.
    TransferAborted {
        contact: ContactId,
        message: MessageId,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Client (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// A new message was generated at this node.
    MessageCreated { message: Message },
}

impl Event {
    /// Get the priority for this event type.
    ///
    /// Events at the same timestamp are processed in priority order,
    /// ensuring causality is preserved.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::MessageArrived { .. }
            | Event::TransferOutcome { .. }
            | Event::TransferCompleted { .. }
            | Event::TransferAborted { .. } => EventPriority::Internal,

            Event::LinkUp { .. } | Event::PeerRefreshed { .. } | Event::LinkDown { .. } => {
                EventPriority::Topology
            }

            Event::Tick => EventPriority::Timer,

            Event::MessageCreated { .. } => EventPriority::Client,
        }
    }

    /// Get the contact this event concerns, if any.
    pub fn contact(&self) -> Option<ContactId> {
        match self {
            Event::LinkUp { contact, .. }
            | Event::PeerRefreshed { contact, .. }
            | Event::LinkDown { contact, .. }
            | Event::MessageArrived { contact, .. }
            | Event::TransferOutcome { contact, .. }
            | Event::TransferCompleted { contact, .. }
            | Event::TransferAborted { contact, .. } => Some(*contact),
            Event::Tick | Event::MessageCreated { .. } => None,
        }
    }

    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Tick => "Tick",
            Event::LinkUp { .. } => "LinkUp",
            Event::PeerRefreshed { .. } => "PeerRefreshed",
            Event::LinkDown { .. } => "LinkDown",
            Event::MessageArrived { .. } => "MessageArrived",
            Event::TransferOutcome { .. } => "TransferOutcome",
            Event::TransferCompleted { .. } => "TransferCompleted",
            Event::TransferAborted { .. } => "TransferAborted",
            Event::MessageCreated { .. } => "MessageCreated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_types::NodeId;
    use std::time::Duration;

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::Internal < EventPriority::Topology);
        assert!(EventPriority::Topology < EventPriority::Timer);
        assert!(EventPriority::Timer < EventPriority::Client);
    }

    #[test]
    fn test_event_priorities() {
        let link_down = Event::LinkDown {
            contact: ContactId(1),
            peer_counters: TrafficCounters::default(),
        };
        assert_eq!(link_down.priority(), EventPriority::Topology);
        assert_eq!(link_down.contact(), Some(ContactId(1)));

        let created = Event::MessageCreated {
            message: Message::new(
                MessageId(1),
                NodeId(0),
                NodeId(1),
                10,
                Duration::from_secs(60),
                Duration::ZERO,
            ),
        };
        assert_eq!(created.priority(), EventPriority::Client);
        assert_eq!(created.contact(), None);
        assert_eq!(Event::Tick.type_name(), "Tick");
    }

    #[test]
    fn test_rejections() {
        assert!(TransferOutcome::RejectedStale.is_rejection());
        assert!(TransferOutcome::RejectedOther.is_rejection());
        assert!(!TransferOutcome::Busy.is_rejection());
        assert!(!TransferOutcome::Started.is_rejection());
    }
}
