//! Action types returned by the state machine.

use ferry_types::{ContactId, Message, MessageId};
use std::fmt;
use std::time::Duration;

/// Why a message left a node's buffer without being forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    /// Evicted to make room for another message.
    Evicted,
    /// Remaining TTL reached zero.
    Expired,
    /// A delivery receipt for the message was learned.
    Confirmed,
    /// A peer reported the message as already delivered.
    Stale,
    /// Admission failed: the buffer could not make room.
    Rejected,
    /// Handed to its final destination; the local copy is no longer needed.
    Delivered,
}

impl DiscardReason {
    /// Check if the discard counts as a congestion drop.
    pub fn is_drop(&self) -> bool {
        matches!(self, DiscardReason::Evicted | DiscardReason::Rejected)
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscardReason::Evicted => "evicted",
            DiscardReason::Expired => "expired",
            DiscardReason::Confirmed => "confirmed",
            DiscardReason::Stale => "stale",
            DiscardReason::Rejected => "rejected",
            DiscardReason::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

/// Actions the state machine asks the host to perform.
///
/// Actions are **commands** - the host executes them and reports results
/// back as events.
#[derive(Debug, Clone)]
pub enum Action {
    /// Send `message` over `contact`. The host answers with
    /// `Event::TransferOutcome`.
    StartTransfer { contact: ContactId, message: Message },

    /// Cancel an in-flight outgoing transfer.
    AbortTransfer {
        contact: ContactId,
        message: MessageId,
    },

    /// A message left the buffer without being forwarded.
    MessageDiscarded {
        message: MessageId,
        reason: DiscardReason,
    },

    /// A message reached this node, its final destination.
    MessageDelivered {
        message: MessageId,
        hops: u32,
        latency: Duration,
    },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::StartTransfer { .. } => "StartTransfer",
            Action::AbortTransfer { .. } => "AbortTransfer",
            Action::MessageDiscarded { .. } => "MessageDiscarded",
            Action::MessageDelivered { .. } => "MessageDelivered",
        }
    }

    /// Check if this action is handled by the transport side of the host.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Action::StartTransfer { .. } | Action::AbortTransfer { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_reasons() {
        assert!(DiscardReason::Evicted.is_drop());
        assert!(DiscardReason::Rejected.is_drop());
        assert!(!DiscardReason::Expired.is_drop());
        assert!(!DiscardReason::Confirmed.is_drop());
        assert_eq!(DiscardReason::Stale.to_string(), "stale");
    }

    #[test]
    fn test_transport_actions() {
        let abort = Action::AbortTransfer {
            contact: ContactId(3),
            message: MessageId(1),
        };
        assert!(abort.is_transport());
        let discarded = Action::MessageDiscarded {
            message: MessageId(1),
            reason: DiscardReason::Expired,
        };
        assert!(!discarded.is_transport());
        assert_eq!(discarded.type_name(), "MessageDiscarded");
    }
}
