//! Delivery receipts.

use crate::ExchangeMessage;
use ferry_types::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Proof that a message reached its final destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Simulated time the destination confirmed delivery.
    pub confirmed_at: Duration,
    /// Message lifetime left at confirmation.
    pub residual_ttl: Duration,
}

impl Receipt {
    /// Time after which no live copy of the message can exist.
    pub fn expires_at(&self) -> Duration {
        self.confirmed_at.saturating_add(self.residual_ttl)
    }
}

/// A peer's receipt ledger as shipped across a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDigest {
    /// message id -> receipt
    pub entries: BTreeMap<MessageId, Receipt>,
}

impl ReceiptDigest {
    /// Create an empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the digest confirms `id`.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of receipts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the digest is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExchangeMessage for ReceiptDigest {
    fn message_type_id() -> &'static str {
        "receipt.digest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_expiry() {
        let receipt = Receipt {
            confirmed_at: Duration::from_secs(100),
            residual_ttl: Duration::from_secs(50),
        };
        assert_eq!(receipt.expires_at(), Duration::from_secs(150));
    }
}
