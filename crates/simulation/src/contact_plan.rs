//! Contact plans: when each pair of nodes can talk.

use crate::{NodeIndex, SimulationError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One period during which nodes `a` and `b` are in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactWindow {
    pub a: NodeIndex,
    pub b: NodeIndex,
    /// Link comes up.
    pub start: Duration,
    /// Link goes down.
    pub end: Duration,
}

impl ContactWindow {
    /// A window from `start` to `end`.
    pub fn new(a: NodeIndex, b: NodeIndex, start: Duration, end: Duration) -> Self {
        Self { a, b, start, end }
    }

    /// The pair in canonical (low, high) order.
    pub fn pair(&self) -> (NodeIndex, NodeIndex) {
        (self.a.min(self.b), self.a.max(self.b))
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Parameters for a seeded random contact plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomContacts {
    /// Plan covers `0..horizon_secs`.
    pub horizon_secs: u64,
    /// Mean gap between two encounters of the same pair.
    pub mean_gap_secs: u64,
    /// Shortest encounter.
    pub min_duration_secs: u64,
    /// Longest encounter.
    pub max_duration_secs: u64,
}

impl Default for RandomContacts {
    fn default() -> Self {
        Self {
            horizon_secs: 3_600,
            mean_gap_secs: 600,
            min_duration_secs: 10,
            max_duration_secs: 120,
        }
    }
}

/// Every contact window of a simulation, sorted by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPlan {
    windows: Vec<ContactWindow>,
}

impl ContactPlan {
    /// A plan made of explicit windows.
    pub fn scripted(mut windows: Vec<ContactWindow>) -> Self {
        windows.sort_by_key(|w| (w.start, w.pair(), w.end));
        Self { windows }
    }

    /// A reproducible random plan: every pair meets at random intervals.
    ///
    /// Gaps are drawn uniformly from `[0, 2 * mean_gap]` and durations from
    /// `[min_duration, max_duration]`, so the same seed always yields the
    /// same plan.
    pub fn random(num_nodes: u32, params: &RandomContacts, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let horizon = params.horizon_secs;
        let max_gap = params.mean_gap_secs.saturating_mul(2);
        let min_len = params.min_duration_secs.max(1);
        let max_len = params.max_duration_secs.max(min_len);

        let mut windows = Vec::new();
        for a in 0..num_nodes {
            for b in (a + 1)..num_nodes {
                let mut t = 0u64;
                loop {
                    let start = t + rng.gen_range(0..=max_gap);
                    if start >= horizon {
                        break;
                    }
                    let end = (start + rng.gen_range(min_len..=max_len)).min(horizon);
                    if end > start {
                        windows.push(ContactWindow::new(
                            a,
                            b,
                            Duration::from_secs(start),
                            Duration::from_secs(end),
                        ));
                    }
                    // Leave at least a second between encounters of one pair.
                    t = end + 1;
                }
            }
        }
        Self::scripted(windows)
    }

    /// All windows, by start time.
    pub fn windows(&self) -> &[ContactWindow] {
        &self.windows
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Check if the plan has no windows.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Check every window fits a network of `num_nodes`, is non-empty, and
    /// does not overlap another window of the same pair.
    pub fn validate(&self, num_nodes: u32) -> Result<(), SimulationError> {
        let mut last_end: BTreeMap<(NodeIndex, NodeIndex), Duration> = BTreeMap::new();
        for window in &self.windows {
            for node in [window.a, window.b] {
                if node >= num_nodes {
                    return Err(SimulationError::UnknownNode { node, num_nodes });
                }
            }
            if window.a == window.b {
                return Err(SimulationError::SelfContact(window.a));
            }
            if window.end <= window.start {
                return Err(SimulationError::EmptyWindow {
                    a: window.a,
                    b: window.b,
                    start: window.start,
                });
            }
            let pair = window.pair();
            if let Some(end) = last_end.get(&pair) {
                if window.start <= *end {
                    return Err(SimulationError::OverlappingWindows {
                        a: pair.0,
                        b: pair.1,
                        at: window.start,
                    });
                }
            }
            last_end.insert(pair, window.end);
        }
        Ok(())
    }
}
