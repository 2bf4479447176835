//! Replica count adjustment.

use crate::ReplicationConfig;
use ferry_types::{CongestionBand, Message, ReplicaCount};
use tracing::debug;

/// What happened to a message's replica count after a hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationDecision {
    /// The peer was lightly congested and took half the copies.
    Halved { from: ReplicaCount, to: ReplicaCount },

    /// The peer was heavily congested and took a single copy.
    Decremented { from: ReplicaCount, to: ReplicaCount },

    /// No change: the message is not replica-governed or the peer reported
    /// no congestion.
    Unchanged,

    /// The peer is overloaded. The count is untouched and the peer must not
    /// be offered further messages for the rest of the contact.
    PeerOverloaded,
}

/// Applies replica control to messages.
#[derive(Debug, Clone, Default)]
pub struct ReplicationController {
    config: ReplicationConfig,
}

impl ReplicationController {
    /// Create a controller.
    pub fn new(config: ReplicationConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Give a freshly generated message its initial copy count.
    ///
    /// Leaves the message untouched when replica control is disabled.
    pub fn stamp_new(&self, message: &mut Message) {
        if let Some(copies) = self.config.initial_copies {
            message.set_replicas(ReplicaCount::new(copies));
        }
    }

    /// Adjust the sender's copy after a completed transfer to a peer whose
    /// latest congestion value is `peer_congestion`.
    pub fn on_transfer_completed(
        &self,
        message: &mut Message,
        peer_congestion: f64,
    ) -> ReplicationDecision {
        let Some(from) = message.replicas() else {
            return ReplicationDecision::Unchanged;
        };

        let decision = match self.config.thresholds.classify(peer_congestion) {
            CongestionBand::Clear => ReplicationDecision::Unchanged,
            CongestionBand::Moderate => ReplicationDecision::Halved {
                from,
                to: from.halved(),
            },
            CongestionBand::Heavy => ReplicationDecision::Decremented {
                from,
                to: from.decremented(),
            },
            CongestionBand::Overloaded => ReplicationDecision::PeerOverloaded,
        };

        if let ReplicationDecision::Halved { to, .. } | ReplicationDecision::Decremented { to, .. } =
            decision
        {
            message.set_replicas(to);
            debug!(
                message = %message.id,
                from = from.get(),
                to = to.get(),
                peer_congestion,
                "Replica count adjusted"
            );
        }
        decision
    }

    /// Check if a message may be offered to a peer at all.
    ///
    /// A replica-governed message with a single copy left is kept for direct
    /// delivery only. Messages without a count are always eligible.
    pub fn eligible_for_forwarding(&self, message: &Message) -> bool {
        message.replicas().map_or(true, |copies| copies.can_spread())
    }

    /// Check if a peer's congestion value rules it out for this contact.
    pub fn refuses_peer(&self, peer_congestion: f64) -> bool {
        self.config.thresholds.is_overloaded(peer_congestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_types::{MessageId, NodeId};
    use std::time::Duration;

    fn message_with(copies: Option<u32>) -> Message {
        let mut message = Message::new(
            MessageId(1),
            NodeId(0),
            NodeId(9),
            100,
            Duration::from_secs(600),
            Duration::ZERO,
        );
        if let Some(copies) = copies {
            message.set_replicas(ReplicaCount::new(copies));
        }
        message
    }

    fn controller() -> ReplicationController {
        ReplicationController::new(ReplicationConfig::with_initial_copies(8))
    }

    #[test]
    fn test_stamp_new() {
        let mut message = message_with(None);
        controller().stamp_new(&mut message);
        assert_eq!(message.replicas(), Some(ReplicaCount::new(8)));

        let mut untouched = message_with(None);
        ReplicationController::default().stamp_new(&mut untouched);
        assert_eq!(untouched.replicas(), None);
    }

    #[test]
    fn test_moderate_peer_halves() {
        let mut message = message_with(Some(8));
        let decision = controller().on_transfer_completed(&mut message, 0.5);
        assert_eq!(
            decision,
            ReplicationDecision::Halved {
                from: ReplicaCount::new(8),
                to: ReplicaCount::new(4)
            }
        );
        assert_eq!(message.replicas(), Some(ReplicaCount::new(4)));

        // 0.7 is still moderate.
        let mut odd = message_with(Some(5));
        controller().on_transfer_completed(&mut odd, 0.7);
        assert_eq!(odd.replicas(), Some(ReplicaCount::new(2)));
    }

    #[test]
    fn test_heavy_peer_decrements() {
        let mut message = message_with(Some(8));
        controller().on_transfer_completed(&mut message, 0.9);
        assert_eq!(message.replicas(), Some(ReplicaCount::new(7)));

        let mut at_bound = message_with(Some(3));
        controller().on_transfer_completed(&mut at_bound, 1.0);
        assert_eq!(at_bound.replicas(), Some(ReplicaCount::new(2)));
    }

    #[test]
    fn test_overloaded_peer_leaves_count() {
        let mut message = message_with(Some(8));
        let decision = controller().on_transfer_completed(&mut message, 1.2);
        assert_eq!(decision, ReplicationDecision::PeerOverloaded);
        assert_eq!(message.replicas(), Some(ReplicaCount::new(8)));
        assert!(controller().refuses_peer(1.2));
        assert!(!controller().refuses_peer(1.0));
    }

    #[test]
    fn test_uncongested_peer_leaves_count() {
        let mut message = message_with(Some(8));
        assert_eq!(
            controller().on_transfer_completed(&mut message, 0.0),
            ReplicationDecision::Unchanged
        );
        assert_eq!(
            controller().on_transfer_completed(&mut message, -0.5),
            ReplicationDecision::Unchanged
        );
        assert_eq!(message.replicas(), Some(ReplicaCount::new(8)));
    }

    #[test]
    fn test_count_never_below_one() {
        let mut message = message_with(Some(1));
        controller().on_transfer_completed(&mut message, 0.5);
        assert_eq!(message.replicas(), Some(ReplicaCount::SINGLE));
        controller().on_transfer_completed(&mut message, 0.9);
        assert_eq!(message.replicas(), Some(ReplicaCount::SINGLE));
    }

    #[test]
    fn test_eligibility() {
        let c = controller();
        assert!(c.eligible_for_forwarding(&message_with(None)));
        assert!(c.eligible_for_forwarding(&message_with(Some(2))));
        assert!(!c.eligible_for_forwarding(&message_with(Some(1))));
    }

    #[test]
    fn test_custom_thresholds() {
        let c = ReplicationController::new(
            ReplicationConfig::with_initial_copies(8)
                .with_thresholds(ferry_types::CongestionThresholds::new(0.3, 0.6)),
        );
        let mut message = message_with(Some(8));
        c.on_transfer_completed(&mut message, 0.5);
        assert_eq!(message.replicas(), Some(ReplicaCount::new(7)));
        assert_eq!(
            c.on_transfer_completed(&mut message, 0.65),
            ReplicationDecision::PeerOverloaded
        );
    }
}
