//! Event queue with deterministic ordering.

use crate::NodeIndex;
use ferry_core::{Event, EventPriority};
use ferry_types::{ContactId, MessageId};
use std::cmp::Ordering;
use std::time::Duration;

/// Something the runner has scheduled.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Deliver an event to the keyed node.
    Node(Event),

    /// Open a link between the keyed node (`a`) and `b`.
    LinkUp {
        contact: ContactId,
        a: NodeIndex,
        b: NodeIndex,
    },

    /// Close a link.
    LinkDown { contact: ContactId },

    /// The last byte of a transfer from the keyed node arrived.
    TransferDone {
        contact: ContactId,
        message: MessageId,
    },
}

impl HostEvent {
    /// Get the priority for this event.
    ///
    /// Finished transfers come before the link closing at the same instant.
    pub fn priority(&self) -> EventPriority {
        match self {
            HostEvent::Node(event) => event.priority(),
            HostEvent::LinkUp { .. } | HostEvent::LinkDown { .. } => EventPriority::Topology,
            HostEvent::TransferDone { .. } => EventPriority::Internal,
        }
    }
}

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (internal before topology before timers before client)
/// 3. Node index (deterministic ordering)
/// 4. Sequence number (FIFO for same time/priority/node)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Priority for ordering at same time.
    pub priority: EventPriority,
    /// Which node receives this event.
    pub node_index: NodeIndex,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    /// Create a new event key from a [`HostEvent`].
    pub fn new(time: Duration, event: &HostEvent, node_index: NodeIndex, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            node_index,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.node_index.cmp(&other.node_index))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(secs: u64, priority: EventPriority, node_index: NodeIndex, sequence: u64) -> EventKey {
        EventKey {
            time: Duration::from_secs(secs),
            priority,
            node_index,
            sequence,
        }
    }

    #[test]
    fn test_event_key_ordering() {
        let earlier = key(1, EventPriority::Client, 0, 2);
        let later = key(2, EventPriority::Internal, 0, 1);
        assert!(earlier < later);
    }

    #[test]
    fn test_priority_ordering_at_same_time() {
        let internal = key(1, EventPriority::Internal, 3, 9);
        let topology = key(1, EventPriority::Topology, 0, 1);
        assert!(
            internal < topology,
            "Transfer results should process before topology changes"
        );
    }

    #[test]
    fn test_node_ordering_at_same_time_and_priority() {
        let node0 = key(1, EventPriority::Timer, 0, 2);
        let node1 = key(1, EventPriority::Timer, 1, 1);
        assert!(node0 < node1, "Lower node index should process first");
    }

    #[test]
    fn test_transfer_done_before_link_down() {
        let done = HostEvent::TransferDone {
            contact: ContactId(1),
            message: MessageId(1),
        };
        let down = HostEvent::LinkDown {
            contact: ContactId(1),
        };
        assert!(done.priority() < down.priority());
        assert_eq!(HostEvent::Node(Event::Tick).priority(), EventPriority::Timer);
    }
}
