//! Metrics collection and the end-of-run report.

use crate::SimulatorError;
use ferry_node::{NodeStateMachine, NodeStats};
use ferry_simulation::SimulationStats;
use ferry_types::{CongestionSample, NodeId};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collects delivery latencies into a histogram.
pub struct MetricsCollector {
    /// Latency histogram (values in milliseconds).
    latency: Histogram<u64>,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("samples", &self.latency.len())
            .finish()
    }
}

impl MetricsCollector {
    /// Create an empty collector. The histogram grows to fit whatever
    /// latencies are recorded.
    pub fn new() -> Result<Self, SimulatorError> {
        Ok(Self {
            latency: Histogram::new(3)?,
        })
    }

    /// Record one delivery latency.
    pub fn record_latency(&mut self, latency: Duration) -> Result<(), SimulatorError> {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency.record(millis)?;
        Ok(())
    }

    /// Number of recorded latencies.
    pub fn samples(&self) -> u64 {
        self.latency.len()
    }

    /// Summarize the recorded latencies.
    pub fn latency_summary(&self) -> LatencySummary {
        if self.latency.is_empty() {
            return LatencySummary::default();
        }
        let at = |q| Duration::from_millis(self.latency.value_at_quantile(q));
        LatencySummary {
            p50: at(0.50),
            p90: at(0.90),
            p99: at(0.99),
            min: Duration::from_millis(self.latency.min()),
            max: Duration::from_millis(self.latency.max()),
            mean: Duration::from_millis(self.latency.mean() as u64),
        }
    }

    /// Build the report for a finished run.
    pub fn finish(
        &mut self,
        duration: Duration,
        stats: &SimulationStats,
        nodes: &[NodeStateMachine],
    ) -> Result<SimulationReport, SimulatorError> {
        for &latency in &stats.latencies {
            self.record_latency(latency)?;
        }
        Ok(SimulationReport {
            duration,
            created: stats.created,
            delivered: stats.delivered,
            relayed: stats.relayed,
            aborted: stats.aborted,
            dropped: stats.dropped,
            expired: stats.expired,
            contacts: stats.contacts,
            delivery_ratio: stats.delivery_ratio(),
            overhead_ratio: stats.overhead_ratio(),
            mean_hops: stats.mean_hops(),
            latency: self.latency_summary(),
            nodes: nodes.iter().map(NodeReport::from_node).collect(),
        })
    }
}

/// Latency percentiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
}

/// Per-node outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node: NodeId,
    /// Congestion value at the end of the run.
    pub congestion: f64,
    /// Every congestion recompute, oldest first.
    pub congestion_history: Vec<CongestionSample>,
    pub stats: NodeStats,
    /// Buffer bytes in use at the end of the run.
    pub buffer_used: u64,
    /// Messages still buffered.
    pub buffered: usize,
}

impl NodeReport {
    fn from_node(node: &NodeStateMachine) -> Self {
        Self {
            node: node.local(),
            congestion: node.congestion_value(),
            congestion_history: node.congestion_history(),
            stats: *node.stats(),
            buffer_used: node.buffer().used(),
            buffered: node.buffer().len(),
        }
    }
}

/// Results of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Simulated time covered.
    pub duration: Duration,
    pub created: u64,
    pub delivered: u64,
    pub relayed: u64,
    pub aborted: u64,
    pub dropped: u64,
    pub expired: u64,
    pub contacts: u64,
    pub delivery_ratio: f64,
    pub overhead_ratio: Option<f64>,
    pub mean_hops: Option<f64>,
    pub latency: LatencySummary,
    pub nodes: Vec<NodeReport>,
}

impl SimulationReport {
    /// Median delivery latency.
    pub fn p50_latency(&self) -> Duration {
        self.latency.p50
    }

    /// 99th percentile delivery latency.
    pub fn p99_latency(&self) -> Duration {
        self.latency.p99
    }

    /// Mean congestion value across nodes at the end of the run.
    pub fn mean_congestion(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.iter().map(|n| n.congestion).sum::<f64>() / self.nodes.len() as f64
    }

    /// Print a summary of the report.
    pub fn print_summary(&self) {
        println!("\n--- Simulation Report ---");
        println!("Duration:    {:?}", self.duration);
        println!("Contacts:    {}", self.contacts);
        println!("Created:     {}", self.created);
        println!("Delivered:   {}", self.delivered);
        println!("Relayed:     {}", self.relayed);
        println!("Aborted:     {}", self.aborted);
        println!("Dropped:     {}", self.dropped);
        println!("Expired:     {}", self.expired);
        println!("Delivery:    {:.4}", self.delivery_ratio);
        match self.overhead_ratio {
            Some(overhead) => println!("Overhead:    {overhead:.4}"),
            None => println!("Overhead:    n/a"),
        }
        if let Some(hops) = self.mean_hops {
            println!("Mean hops:   {hops:.2}");
        }

        if self.delivered > 0 {
            println!();
            println!("Latency:");
            println!("  P50:  {:?}", self.latency.p50);
            println!("  P90:  {:?}", self.latency.p90);
            println!("  P99:  {:?}", self.latency.p99);
            println!("  Max:  {:?}", self.latency.max);
            println!("  Avg:  {:?}", self.latency.mean);
            println!("  Min:  {:?}", self.latency.min);
        }

        println!();
        println!("Congestion per node:");
        for node in &self.nodes {
            println!(
                "  {}: {:.4} ({} samples, {} drops, {} buffered)",
                node.node,
                node.congestion,
                node.congestion_history.len(),
                node.stats.drops(),
                node.buffered
            );
        }
    }
}
