//! Simulator runner that ties contacts, workload and metrics together.

use crate::config::SimulatorConfig;
use crate::metrics::{MetricsCollector, SimulationReport};
use crate::workload::{UniformWorkload, WorkloadGenerator};
use crate::SimulatorError;
use ferry_simulation::{ContactPlan, SimulationRunner};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Number of progress reports per run.
const PROGRESS_STEPS: u32 = 10;

/// High-level simulator: a random contact plan, a uniform workload and the
/// deterministic simulation underneath.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
    plan_len: usize,
    scheduled: u64,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("num_nodes", &self.config.num_nodes())
            .field("seed", &self.config.seed)
            .field("contacts", &self.plan_len)
            .field("scheduled", &self.scheduled)
            .field("now", &self.runner.now())
            .finish()
    }
}

impl Simulator {
    /// Build the contact plan and schedule the whole workload.
    ///
    /// Contacts and messages are drawn from independent streams of the
    /// configured seed, so the same config always produces the same run.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        let num_nodes = config.num_nodes();

        let plan = ContactPlan::random(num_nodes, &config.contacts, config.seed);
        let mut runner = SimulationRunner::new(config.network.clone(), &plan)?;

        let horizon = Duration::from_secs(config.contacts.horizon_secs);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
        let mut workload = UniformWorkload::new(config.workload.clone(), num_nodes);
        let messages = workload.generate_until(horizon, &mut rng);
        let scheduled = messages.len() as u64;
        for message in messages {
            runner.schedule_message(message)?;
        }

        info!(
            num_nodes,
            seed = config.seed,
            contacts = plan.len(),
            messages = scheduled,
            "Simulator initialized"
        );

        Ok(Self {
            plan_len: plan.len(),
            config,
            runner,
            scheduled,
        })
    }

    /// Configuration this simulator was built from.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of messages scheduled for creation.
    pub fn scheduled_messages(&self) -> u64 {
        self.scheduled
    }

    /// Number of contact windows in the plan.
    pub fn contact_windows(&self) -> usize {
        self.plan_len
    }

    /// Underlying simulation, for inspection.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    /// Advance the simulation by `duration` and report on everything so far.
    pub fn run_for(&mut self, duration: Duration) -> Result<SimulationReport, SimulatorError> {
        let start = self.runner.now();
        let end = start + duration;
        let step = (duration / PROGRESS_STEPS).max(Duration::from_secs(1));

        let mut next = start;
        while next < end {
            next = (next + step).min(end);
            self.runner.run_until(next);
            let stats = self.runner.stats();
            debug!(
                now = ?self.runner.now(),
                created = stats.created,
                delivered = stats.delivered,
                relayed = stats.relayed,
                dropped = stats.dropped,
                open_links = self.runner.open_links(),
                "Progress"
            );
        }

        let stats = self.runner.stats();
        info!(
            created = stats.created,
            delivered = stats.delivered,
            delivery_ratio = stats.delivery_ratio(),
            events = stats.events_processed,
            "Simulation finished"
        );

        let mut metrics = MetricsCollector::new()?;
        metrics.finish(end, stats, self.runner.nodes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use ferry_node::NodeConfig;
    use ferry_simulation::RandomContacts;
    use tracing_test::traced_test;

    fn small_config(seed: u64) -> SimulatorConfig {
        let contacts = RandomContacts {
            horizon_secs: 1_800,
            mean_gap_secs: 120,
            min_duration_secs: 5,
            max_duration_secs: 30,
        };
        let workload = WorkloadConfig::default()
            .with_interval(Duration::from_secs(20), Duration::from_secs(40))
            .with_sizes(1_000, 5_000);
        SimulatorConfig::new(5)
            .with_contacts(contacts)
            .with_workload(workload)
            .with_bandwidth(10_000)
            .with_node_config(NodeConfig::default().with_buffer_capacity(50_000))
            .with_seed(seed)
    }

    #[traced_test]
    #[test]
    fn test_same_seed_same_report() {
        let run = |seed| {
            let mut simulator = Simulator::new(small_config(seed)).unwrap();
            simulator.run_for(Duration::from_secs(1_800)).unwrap()
        };
        let first = run(42);
        assert_eq!(first, run(42));
        assert_eq!(first.nodes.len(), 5);
        assert!(first.created > 0);
        assert!(first.delivered <= first.created);
        assert!((0.0..=1.0).contains(&first.delivery_ratio));
    }

    #[test]
    fn test_report_latency_covers_observed_deliveries() {
        let mut simulator = Simulator::new(small_config(7)).unwrap();
        let report = simulator.run_for(Duration::from_secs(1_800)).unwrap();

        let observed = &simulator.runner().stats().latencies;
        assert_eq!(observed.len() as u64, report.delivered);
        if let (Some(longest), Some(shortest)) = (observed.iter().max(), observed.iter().min()) {
            assert!(report.latency.max.as_millis() >= longest.as_millis());
            assert!(report.latency.min.as_millis() <= shortest.as_millis());
        }
    }

    #[test]
    fn test_workload_scheduled_up_front() {
        let simulator = Simulator::new(small_config(1)).unwrap();
        assert!(simulator.scheduled_messages() >= 44);
        assert!(simulator.contact_windows() > 0);
        assert_eq!(simulator.runner().stats().created, 0);
    }

    #[test]
    fn test_runs_accumulate() {
        let mut simulator = Simulator::new(small_config(3)).unwrap();
        let first = simulator.run_for(Duration::from_secs(600)).unwrap();
        let second = simulator.run_for(Duration::from_secs(600)).unwrap();
        assert_eq!(second.duration, Duration::from_secs(1_200));
        assert!(second.created >= first.created);
        assert!(second.delivered >= first.delivered);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Simulator::new(SimulatorConfig::new(1)),
            Err(SimulatorError::Config(_))
        ));
    }
}
