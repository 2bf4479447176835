//! Uniform random workload generator.

use crate::config::WorkloadConfig;
use crate::workload::WorkloadGenerator;
use ferry_types::{Message, MessageId, NodeId};
use std::time::Duration;

/// Generates messages between uniformly chosen node pairs at uniformly
/// distributed intervals.
#[derive(Debug, Clone)]
pub struct UniformWorkload {
    config: WorkloadConfig,
    num_nodes: u32,
    next_id: u64,
    next_at: Duration,
}

impl UniformWorkload {
    /// Create a generator over nodes `0..num_nodes`.
    pub fn new(config: WorkloadConfig, num_nodes: u32) -> Self {
        Self {
            config,
            num_nodes,
            next_id: 1,
            next_at: Duration::ZERO,
        }
    }

    /// Number of messages generated so far.
    pub fn generated(&self) -> u64 {
        self.next_id - 1
    }
}

impl WorkloadGenerator for UniformWorkload {
    fn generate_one(&mut self, rng: &mut impl rand::Rng) -> Option<Message> {
        if self.num_nodes < 2 {
            return None;
        }

        let gap = rng.gen_range(self.config.min_interval_secs..=self.config.max_interval_secs);
        let created_at = self.next_at + Duration::from_secs(gap);
        let source = rng.gen_range(0..self.num_nodes);
        // Any node but the source.
        let destination = (source + rng.gen_range(1..self.num_nodes)) % self.num_nodes;
        let size = rng.gen_range(self.config.min_size..=self.config.max_size);

        let message = Message::new(
            MessageId(self.next_id),
            NodeId(source),
            NodeId(destination),
            size,
            self.config.ttl(),
            created_at,
        );
        self.next_id += 1;
        self.next_at = created_at;
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_messages_follow_config() {
        let config = WorkloadConfig::default()
            .with_interval(Duration::from_secs(10), Duration::from_secs(20))
            .with_sizes(100, 200);
        let mut workload = UniformWorkload::new(config, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let messages = workload.generate_until(Duration::from_secs(1_000), &mut rng);
        assert!(messages.len() >= 49 && messages.len() <= 100);
        // The message that crossed the horizon was generated but not returned.
        assert_eq!(workload.generated(), messages.len() as u64 + 1);

        let mut last = Duration::ZERO;
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.id, MessageId(i as u64 + 1));
            assert_ne!(message.source, message.destination);
            assert!(message.destination.index() < 4);
            assert!((100..=200).contains(&message.size));
            let gap = message.created_at - last;
            assert!(gap >= Duration::from_secs(10) && gap <= Duration::from_secs(20));
            last = message.created_at;
        }
    }

    #[test]
    fn test_same_seed_same_workload() {
        let generate = |seed| {
            let mut workload = UniformWorkload::new(WorkloadConfig::default(), 5);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            workload.generate_until(Duration::from_secs(3_600), &mut rng)
        };
        assert_eq!(generate(3), generate(3));
        assert_ne!(generate(3), generate(4));
    }

    #[test]
    fn test_single_node_generates_nothing() {
        let mut workload = UniformWorkload::new(WorkloadConfig::default(), 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(workload.generate_one(&mut rng).is_none());
    }
}
