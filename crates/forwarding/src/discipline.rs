//! Tie-breaking between candidates of equal predictability.

use ferry_types::{Message, MessageId};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Orders candidates the predictability ranking cannot tell apart.
pub trait QueueDiscipline: fmt::Debug {
    /// Compare two messages; `Less` is sent first.
    fn compare(&self, a: &Message, b: &Message, now: Duration) -> Ordering;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Messages that arrived in the buffer earliest go first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrivalOrder;

impl QueueDiscipline for ArrivalOrder {
    fn compare(&self, a: &Message, b: &Message, _now: Duration) -> Ordering {
        a.received_at.cmp(&b.received_at)
    }

    fn name(&self) -> &'static str {
        "oldest_first"
    }
}

/// Messages closest to expiry go first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestTtlFirst;

impl QueueDiscipline for ShortestTtlFirst {
    fn compare(&self, a: &Message, b: &Message, now: Duration) -> Ordering {
        a.remaining_ttl(now).cmp(&b.remaining_ttl(now))
    }

    fn name(&self) -> &'static str {
        "shortest_remaining_ttl_first"
    }
}

/// Seeded pseudo-random order.
///
/// Each message draws a key from a ChaCha stream seeded by the configured
/// seed and its id, so the order is stable across runs and across nodes
/// sharing a seed.
#[derive(Debug, Clone, Copy)]
pub struct RandomOrder {
    seed: u64,
}

impl RandomOrder {
    /// Create a random order from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn key(&self, id: MessageId) -> u64 {
        ChaCha8Rng::seed_from_u64(self.seed ^ id.0).next_u64()
    }
}

impl QueueDiscipline for RandomOrder {
    fn compare(&self, a: &Message, b: &Message, _now: Duration) -> Ordering {
        self.key(a.id).cmp(&self.key(b.id))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
