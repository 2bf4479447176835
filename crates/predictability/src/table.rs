//! The per-node predictability table.

use crate::PredictabilityConfig;
use ferry_messages::PredictabilityVector;
use ferry_types::NodeId;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

/// Aging exponents smaller than this are treated as no elapsed time.
const AGING_EPSILON: f64 = 1e-9;

/// Delivery predictabilities from one node to every node it has heard of.
///
/// Values are never negative. They grow toward 1 with contact and decay
/// toward 0 with time. Every read and write ages the table to the given
/// instant first, so callers never see a stale value.
#[derive(Debug, Clone)]
pub struct PredictabilityTable {
    /// Owner of the table.
    local: NodeId,

    /// destination -> predictability
    preds: BTreeMap<NodeId, f64>,

    /// Instant the stored values were last aged to.
    last_aged: Duration,

    config: PredictabilityConfig,
}

impl PredictabilityTable {
    /// Create an empty table for `local`.
    pub fn new(local: NodeId, config: PredictabilityConfig) -> Self {
        Self {
            local,
            preds: BTreeMap::new(),
            last_aged: Duration::ZERO,
            config,
        }
    }

    /// Owner of the table.
    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Constants in use.
    pub fn config(&self) -> &PredictabilityConfig {
        &self.config
    }

    /// Decay every value by `gamma^k`, where `k` is the number of time units
    /// elapsed since the last aging.
    ///
    /// Earlier instants are ignored, and aging twice at the same instant is a
    /// no-op.
    pub fn age(&mut self, now: Duration) {
        let Some(elapsed) = now.checked_sub(self.last_aged) else {
            return;
        };
        let k = elapsed.as_secs_f64() / self.config.time_unit().as_secs_f64();
        if k < AGING_EPSILON {
            return;
        }

        let factor = self.config.gamma.powf(k);
        for value in self.preds.values_mut() {
            *value *= factor;
        }
        self.last_aged = now;
    }

    /// Direct encounter with `peer`: `P = P_old + (1 - P_old) * P_INIT`.
    pub fn note_contact(&mut self, peer: NodeId, now: Duration) {
        self.age(now);
        let p_init = self.config.p_init;
        let value = self.preds.entry(peer).or_insert(0.0);
        *value += (1.0 - *value) * p_init;
        trace!(local = %self.local, peer = %peer, p = *value, "Contact predictability update");
    }

    /// Fold a peer's vector into this table.
    ///
    /// For every destination `h` the peer knows, except this node itself:
    /// `P(self,h) = P_old + (1 - P_old) * P(self,peer) * P(peer,h) * BETA`.
    pub fn apply_transitive(
        &mut self,
        peer: NodeId,
        vector: &PredictabilityVector,
        now: Duration,
    ) {
        self.age(now);
        let p_to_peer = self.preds.get(&peer).copied().unwrap_or(0.0);
        let beta = self.config.beta;

        for (dest, p_peer_dest) in vector.iter() {
            if dest == self.local {
                continue;
            }
            let value = self.preds.entry(dest).or_insert(0.0);
            *value += (1.0 - *value) * p_to_peer * p_peer_dest * beta;
        }
        trace!(
            local = %self.local,
            peer = %peer,
            entries = vector.len(),
            "Transitive predictability update"
        );
    }

    /// Predictability of reaching `node`, aged to `now`; 0 if unknown.
    pub fn get(&mut self, node: NodeId, now: Duration) -> f64 {
        self.age(now);
        self.peek(node)
    }

    /// Stored predictability without aging.
    pub fn peek(&self, node: NodeId) -> f64 {
        self.preds.get(&node).copied().unwrap_or(0.0)
    }

    /// The vector a peer receives at contact time, aged to `now`.
    pub fn snapshot(&mut self, now: Duration) -> PredictabilityVector {
        self.age(now);
        PredictabilityVector {
            owner: self.local,
            entries: self.preds.clone(),
        }
    }

    /// Iterate over stored (destination, predictability) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.preds.iter().map(|(node, p)| (*node, *p))
    }

    /// Number of known destinations.
    pub fn len(&self) -> usize {
        self.preds.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn table(local: u32) -> PredictabilityTable {
        PredictabilityTable::new(NodeId(local), PredictabilityConfig::default())
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_first_contact_both_ways() {
        let mut a = table(0);
        let mut b = table(1);
        a.note_contact(NodeId(1), Duration::ZERO);
        b.note_contact(NodeId(0), Duration::ZERO);

        assert!((a.get(NodeId(1), Duration::ZERO) - 0.75).abs() < EPS);
        assert!((b.get(NodeId(0), Duration::ZERO) - 0.75).abs() < EPS);
    }

    #[test]
    fn test_repeated_contact_is_monotone() {
        let mut a = table(0);
        let mut previous = 0.0;
        for i in 0..5 {
            a.note_contact(NodeId(1), secs(i));
            let p = a.get(NodeId(1), secs(i));
            assert!(p >= previous);
            assert!(p <= 1.0);
            previous = p;
        }
        // 1 - 0.25^2 at the second contact, before any meaningful aging.
        let mut b = table(0);
        b.note_contact(NodeId(1), Duration::ZERO);
        b.note_contact(NodeId(1), Duration::ZERO);
        assert!((b.peek(NodeId(1)) - 0.9375).abs() < EPS);
    }

    #[test]
    fn test_aging_by_whole_units() {
        let mut a = table(0);
        a.note_contact(NodeId(1), Duration::ZERO);

        let p = a.get(NodeId(1), secs(30));
        assert!((p - 0.75 * 0.98).abs() < EPS);

        let p = a.get(NodeId(1), secs(90));
        assert!((p - 0.75 * 0.98f64.powi(3)).abs() < EPS);
    }

    #[test]
    fn test_aging_is_idempotent_within_an_instant() {
        let mut a = table(0);
        a.note_contact(NodeId(1), Duration::ZERO);
        let first = a.get(NodeId(1), secs(45));
        let second = a.get(NodeId(1), secs(45));
        assert_eq!(first, second);
    }

    #[test]
    fn test_earlier_time_is_ignored() {
        let mut a = table(0);
        a.note_contact(NodeId(1), secs(100));
        let at_100 = a.peek(NodeId(1));
        a.age(secs(50));
        assert_eq!(a.peek(NodeId(1)), at_100);
    }

    #[test]
    fn test_non_increasing_without_contact() {
        let mut a = table(0);
        a.note_contact(NodeId(1), Duration::ZERO);
        let mut previous = a.peek(NodeId(1));
        for t in (10..1000).step_by(37) {
            let p = a.get(NodeId(1), secs(t));
            assert!(p >= 0.0);
            assert!(p <= previous);
            previous = p;
        }
    }

    #[test]
    fn test_transitive_update() {
        let mut a = table(0);
        let mut b = table(1);
        b.note_contact(NodeId(2), Duration::ZERO);

        a.note_contact(NodeId(1), Duration::ZERO);
        let vector = b.snapshot(Duration::ZERO);
        a.apply_transitive(NodeId(1), &vector, Duration::ZERO);

        // 0.75 * 0.75 * 0.25
        assert!((a.get(NodeId(2), Duration::ZERO) - 0.140625).abs() < EPS);
    }

    #[test]
    fn test_transitive_skips_self() {
        let mut a = table(0);
        a.note_contact(NodeId(1), Duration::ZERO);

        let mut vector = PredictabilityVector::new(NodeId(1));
        vector.entries.insert(NodeId(0), 0.9);
        vector.entries.insert(NodeId(3), 0.4);
        a.apply_transitive(NodeId(1), &vector, Duration::ZERO);

        assert_eq!(a.peek(NodeId(0)), 0.0);
        assert!(a.peek(NodeId(3)) > 0.0);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_transitive_without_contact_adds_nothing() {
        let mut a = table(0);
        let mut vector = PredictabilityVector::new(NodeId(1));
        vector.entries.insert(NodeId(3), 0.4);
        a.apply_transitive(NodeId(1), &vector, Duration::ZERO);
        assert_eq!(a.peek(NodeId(3)), 0.0);
    }

    #[test]
    fn test_snapshot_is_aged() {
        let mut a = table(0);
        a.note_contact(NodeId(1), Duration::ZERO);
        let vector = a.snapshot(secs(30));
        assert_eq!(vector.owner, NodeId(0));
        assert!((vector.get(NodeId(1)) - 0.735).abs() < EPS);
    }
}
