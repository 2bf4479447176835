//! Workload generation for simulations.
//!
//! Provides message generators for loading the network.

mod uniform;

pub use uniform::UniformWorkload;

use ferry_types::Message;
use std::time::Duration;

/// Trait for generating message workloads.
pub trait WorkloadGenerator {
    /// Generate the next message, or `None` once the generator is exhausted.
    ///
    /// Messages come out in non-decreasing creation time.
    fn generate_one(&mut self, rng: &mut impl rand::Rng) -> Option<Message>;

    /// Generate every message created before `end`.
    fn generate_until(&mut self, end: Duration, rng: &mut impl rand::Rng) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.generate_one(rng) {
            if message.created_at >= end {
                break;
            }
            messages.push(message);
        }
        messages
    }
}
