//! Receipt ledger.

use ferry_messages::{Receipt, ReceiptDigest};
use ferry_types::{Message, MessageId, NodeId};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Tracks which messages are known to have been delivered.
///
/// Entries are only ever added by a destination or merged from a peer. An
/// existing entry is never overwritten, so the first confirmation wins
/// everywhere. Entries are dropped once every copy of their message must
/// have expired.
#[derive(Debug, Clone, Default)]
pub struct ReceiptLedger {
    /// message id -> receipt
    receipts: BTreeMap<MessageId, Receipt>,
}

impl ReceiptLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a peer's digest by union, keeping existing entries.
    ///
    /// Returns the number of newly learned receipts.
    pub fn merge(&mut self, digest: &ReceiptDigest) -> usize {
        let mut learned = 0;
        for (id, receipt) in &digest.entries {
            if let Entry::Vacant(entry) = self.receipts.entry(*id) {
                entry.insert(*receipt);
                learned += 1;
            }
        }
        if learned > 0 {
            debug!(learned, total = self.receipts.len(), "Merged delivery receipts");
        }
        learned
    }

    /// Record a receipt if `local` is the message's final destination.
    ///
    /// Returns whether a new receipt was recorded.
    pub fn record_if_destination(
        &mut self,
        local: NodeId,
        message: &Message,
        now: Duration,
    ) -> bool {
        if !message.is_destined_for(local) || self.receipts.contains_key(&message.id) {
            return false;
        }
        self.receipts.insert(
            message.id,
            Receipt {
                confirmed_at: now,
                residual_ttl: message.remaining_ttl(now),
            },
        );
        true
    }

    /// The buffered ids that are already confirmed delivered.
    ///
    /// The caller aborts any in-flight transfer of these ids before deleting
    /// them. Calling this again after deletion yields nothing new.
    pub fn purge_confirmed<'a>(
        &self,
        buffered: impl IntoIterator<Item = &'a MessageId>,
    ) -> Vec<MessageId> {
        buffered
            .into_iter()
            .filter(|id| self.receipts.contains_key(id))
            .copied()
            .collect()
    }

    /// Check if `id` is confirmed delivered.
    pub fn is_confirmed(&self, id: &MessageId) -> bool {
        self.receipts.contains_key(id)
    }

    /// Get the receipt for `id`.
    pub fn get(&self, id: &MessageId) -> Option<&Receipt> {
        self.receipts.get(id)
    }

    /// Drop receipts whose message can no longer exist anywhere.
    ///
    /// Returns the number of entries removed.
    pub fn prune_expired(&mut self, now: Duration) -> usize {
        let before = self.receipts.len();
        self.receipts.retain(|_, receipt| receipt.expires_at() > now);
        before - self.receipts.len()
    }

    /// The digest a peer receives at contact time.
    pub fn digest(&self) -> ReceiptDigest {
        ReceiptDigest {
            entries: self.receipts.clone(),
        }
    }

    /// Number of receipts held.
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// Check if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn message(id: u64, dest: u32) -> Message {
        Message::new(MessageId(id), NodeId(0), NodeId(dest), 100, secs(1000), Duration::ZERO)
    }

    #[test]
    fn test_record_only_at_destination() {
        let mut ledger = ReceiptLedger::new();
        assert!(!ledger.record_if_destination(NodeId(1), &message(1, 2), secs(10)));
        assert!(ledger.record_if_destination(NodeId(2), &message(1, 2), secs(10)));
        assert!(!ledger.record_if_destination(NodeId(2), &message(1, 2), secs(20)));

        let receipt = ledger.get(&MessageId(1)).unwrap();
        assert_eq!(receipt.confirmed_at, secs(10));
        assert_eq!(receipt.residual_ttl, secs(990));
    }

    #[test]
    fn test_merge_is_union_keeping_existing() {
        let mut ledger = ReceiptLedger::new();
        ledger.record_if_destination(NodeId(2), &message(1, 2), secs(10));

        let mut digest = ReceiptDigest::new();
        digest.entries.insert(
            MessageId(1),
            Receipt {
                confirmed_at: secs(99),
                residual_ttl: secs(1),
            },
        );
        digest.entries.insert(
            MessageId(2),
            Receipt {
                confirmed_at: secs(5),
                residual_ttl: secs(500),
            },
        );

        assert_eq!(ledger.merge(&digest), 1);
        assert_eq!(ledger.get(&MessageId(1)).unwrap().confirmed_at, secs(10));
        assert!(ledger.is_confirmed(&MessageId(2)));
        assert_eq!(ledger.merge(&digest), 0);
    }

    #[test]
    fn test_purge_is_idempotent() {
        let mut ledger = ReceiptLedger::new();
        ledger.record_if_destination(NodeId(2), &message(1, 2), secs(10));

        let mut buffered = vec![MessageId(1), MessageId(3)];
        let purged = ledger.purge_confirmed(&buffered);
        assert_eq!(purged, vec![MessageId(1)]);

        buffered.retain(|id| !purged.contains(id));
        assert!(ledger.purge_confirmed(&buffered).is_empty());
    }

    #[test]
    fn test_prune_expired() {
        let mut ledger = ReceiptLedger::new();
        ledger.record_if_destination(NodeId(2), &message(1, 2), secs(10));

        assert_eq!(ledger.prune_expired(secs(999)), 0);
        assert_eq!(ledger.prune_expired(secs(1000)), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_digest_matches_ledger() {
        let mut ledger = ReceiptLedger::new();
        ledger.record_if_destination(NodeId(2), &message(1, 2), secs(10));
        let digest = ledger.digest();
        assert_eq!(digest.len(), 1);
        assert!(digest.contains(&MessageId(1)));
    }
}
