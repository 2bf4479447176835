//! Configuration for the forwarding scheduler.

use crate::{ArrivalOrder, QueueDiscipline, RandomOrder, ShortestTtlFirst};
use serde::{Deserialize, Serialize};

/// Tie-break discipline selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Earliest arrival first.
    #[default]
    OldestFirst,
    /// Least remaining lifetime first.
    ShortestRemainingTtlFirst,
    /// Seeded pseudo-random order.
    Random { seed: u64 },
}

impl QueueMode {
    /// Build the discipline this mode names.
    pub fn discipline(&self) -> Box<dyn QueueDiscipline> {
        match *self {
            QueueMode::OldestFirst => Box::new(ArrivalOrder),
            QueueMode::ShortestRemainingTtlFirst => Box::new(ShortestTtlFirst),
            QueueMode::Random { seed } => Box::new(RandomOrder::new(seed)),
        }
    }
}

/// Forwarding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Tie-break between candidates of equal peer predictability.
    pub queue_mode: QueueMode,

    /// Rank messages destined to the peer itself ahead of everything else.
    pub deliverable_first: bool,

    /// Drop the local copy once the message is known to be delivered: after
    /// handing it to its destination, or when a peer rejects it as stale.
    pub delete_delivered: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            queue_mode: QueueMode::OldestFirst,
            deliverable_first: true,
            delete_delivered: true,
        }
    }
}

impl ForwardingConfig {
    /// Override the queue mode.
    pub fn with_queue_mode(mut self, queue_mode: QueueMode) -> Self {
        self.queue_mode = queue_mode;
        self
    }

    /// Keep local copies after delivery.
    pub fn keep_delivered(mut self) -> Self {
        self.delete_delivered = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_mode_serde() {
        let mode: QueueMode = serde_json::from_str(r#""shortest_remaining_ttl_first""#).unwrap();
        assert_eq!(mode, QueueMode::ShortestRemainingTtlFirst);

        let mode: QueueMode = serde_json::from_str(r#"{"random": {"seed": 9}}"#).unwrap();
        assert_eq!(mode, QueueMode::Random { seed: 9 });
        assert_eq!(mode.discipline().name(), "random");
    }

    #[test]
    fn test_defaults() {
        let config: ForwardingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ForwardingConfig::default());
        assert!(config.delete_delivered);
        assert_eq!(config.queue_mode.discipline().name(), "oldest_first");
    }
}
