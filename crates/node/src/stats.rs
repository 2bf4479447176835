//! Cumulative per-node statistics.

use ferry_core::DiscardReason;
use serde::{Deserialize, Serialize};

/// Running totals since the node was created. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Messages generated here.
    pub created: u64,
    /// Messages received from peers (including duplicates at destination).
    pub received: u64,
    /// Messages that reached this node as their destination, first copy only.
    pub delivered: u64,
    /// Outgoing transfers that completed.
    pub relayed: u64,
    /// Outgoing transfers that were aborted.
    pub aborted: u64,
    /// Outgoing transfers the peer refused.
    pub refused: u64,
    /// Messages evicted for space.
    pub evicted: u64,
    /// Messages refused admission for lack of space.
    pub rejected: u64,
    /// Messages whose TTL ran out in the buffer.
    pub expired: u64,
    /// Copies dropped because delivery was confirmed (receipt, stale
    /// rejection, or hand-off to the destination).
    pub purged: u64,
}

impl NodeStats {
    pub(crate) fn note_discard(&mut self, reason: DiscardReason) {
        match reason {
            DiscardReason::Evicted => self.evicted += 1,
            DiscardReason::Rejected => self.rejected += 1,
            DiscardReason::Expired => self.expired += 1,
            DiscardReason::Confirmed | DiscardReason::Stale | DiscardReason::Delivered => {
                self.purged += 1
            }
        }
    }

    /// Congestion drops: evictions plus rejected admissions.
    pub fn drops(&self) -> u64 {
        self.evicted + self.rejected
    }
}
