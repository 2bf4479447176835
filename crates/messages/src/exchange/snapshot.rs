//! Everything a node learns about a peer at the start of a contact.

use super::{CongestionReport, PredictabilityVector, ReceiptDigest, PROTOCOL_VERSION};
use crate::ExchangeMessage;
use ferry_types::{MessageId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A peer's routing state captured by the host when a link comes up.
///
/// The snapshot is a value: later changes on the peer are only seen when the
/// host delivers a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    /// The peer.
    pub node: NodeId,
    /// Contact protocol version the peer speaks.
    pub protocol: u16,
    /// The peer's aged predictability table.
    pub predictability: PredictabilityVector,
    /// The peer's receipt ledger.
    pub receipts: ReceiptDigest,
    /// The peer's congestion value and counters.
    pub congestion: CongestionReport,
    /// Ids of messages the peer currently buffers.
    pub holdings: BTreeSet<MessageId>,
    /// Whether the peer is already busy sending or receiving.
    pub transferring: bool,
}

impl PeerSnapshot {
    /// Create an empty snapshot for `node` at the current protocol version.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            protocol: PROTOCOL_VERSION,
            predictability: PredictabilityVector::new(node),
            receipts: ReceiptDigest::new(),
            congestion: CongestionReport::default(),
            holdings: BTreeSet::new(),
            transferring: false,
        }
    }

    /// Check if the peer already holds `id`.
    pub fn holds(&self, id: &MessageId) -> bool {
        self.holdings.contains(id)
    }

    /// Check if the peer speaks our protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol == PROTOCOL_VERSION
    }
}

impl ExchangeMessage for PeerSnapshot {
    fn message_type_id() -> &'static str {
        "peer.snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Receipt;
    use std::time::Duration;

    #[test]
    fn test_new_snapshot_is_compatible() {
        let snapshot = PeerSnapshot::new(NodeId(4));
        assert!(snapshot.is_compatible());
        assert_eq!(snapshot.predictability.owner, NodeId(4));
        assert!(!snapshot.holds(&MessageId(1)));
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut snapshot = PeerSnapshot::new(NodeId(2));
        snapshot.holdings.insert(MessageId(7));
        snapshot.predictability.entries.insert(NodeId(3), 0.4);
        snapshot.receipts.entries.insert(
            MessageId(9),
            Receipt {
                confirmed_at: Duration::from_secs(10),
                residual_ttl: Duration::from_secs(20),
            },
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: PeerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
