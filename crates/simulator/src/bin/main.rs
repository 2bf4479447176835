//! Ferry Simulator CLI
//!
//! Run deterministic routing simulations with configurable parameters.
//!
//! # Example
//!
//! ```bash
//! # Ten nodes for two hours with a fixed seed
//! ferry-sim --seed 42 -n 10 -d 7200
//!
//! # Replica control and peer-folded congestion
//! ferry-sim -n 20 --copies 8 --fold-peer-counters --json
//! ```

use clap::{Parser, ValueEnum};
use ferry_congestion::CongestionConfig;
use ferry_forwarding::{ForwardingConfig, QueueMode};
use ferry_node::NodeConfig;
use ferry_simulation::RandomContacts;
use ferry_simulator::{Simulator, SimulatorConfig};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Tie-break order between equally good candidates.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Queue {
    Oldest,
    ShortestTtl,
    Random,
}

/// Ferry Simulator
///
/// Runs deterministic PRoPHET routing simulations over random contacts.
/// Single-threaded, reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "ferry-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes
    #[arg(short = 'n', long, default_value = "10")]
    nodes: u32,

    /// Simulation duration in seconds
    #[arg(short = 'd', long, default_value = "3600")]
    duration: u64,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Link bandwidth in bytes per second
    #[arg(long, default_value = "250000")]
    bandwidth: u64,

    /// Buffer capacity per node in bytes
    #[arg(long, default_value = "5000000")]
    buffer: u64,

    /// Initial replica count. Unlimited replication when omitted.
    #[arg(long)]
    copies: Option<u32>,

    /// Weight of the newest congestion sample, in (0.0, 1.0]
    #[arg(long, default_value = "0.5")]
    alpha: f64,

    /// Fold peer drop and intake counters into the congestion estimate
    #[arg(long)]
    fold_peer_counters: bool,

    /// Mean gap between two encounters of the same pair, in seconds
    #[arg(long, default_value = "600")]
    mean_gap: u64,

    /// Tie-break order between equally good candidates
    #[arg(long, value_enum, default_value = "oldest")]
    queue: Queue,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,ferry_simulator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    info!(
        nodes = args.nodes,
        duration_secs = args.duration,
        seed,
        bandwidth = args.bandwidth,
        buffer = args.buffer,
        copies = ?args.copies,
        alpha = args.alpha,
        fold_peer_counters = args.fold_peer_counters,
        "Starting simulation"
    );

    let queue_mode = match args.queue {
        Queue::Oldest => QueueMode::OldestFirst,
        Queue::ShortestTtl => QueueMode::ShortestRemainingTtlFirst,
        Queue::Random => QueueMode::Random { seed },
    };

    let mut congestion = CongestionConfig::default().with_alpha(args.alpha);
    if args.fold_peer_counters {
        congestion = congestion.with_peer_counters();
    }

    let mut node = NodeConfig::default()
        .with_buffer_capacity(args.buffer)
        .with_congestion(congestion)
        .with_forwarding(ForwardingConfig::default().with_queue_mode(queue_mode));
    if let Some(copies) = args.copies {
        node = node.with_initial_copies(copies);
    }

    let contacts = RandomContacts {
        horizon_secs: args.duration,
        mean_gap_secs: args.mean_gap,
        ..RandomContacts::default()
    };

    let config = SimulatorConfig::new(args.nodes)
        .with_node_config(node)
        .with_bandwidth(args.bandwidth)
        .with_contacts(contacts)
        .with_seed(seed);

    let mut simulator = match Simulator::new(config) {
        Ok(simulator) => simulator,
        Err(e) => {
            error!(error = %e, "Failed to create simulator");
            return ExitCode::FAILURE;
        }
    };

    let report = match simulator.run_for(Duration::from_secs(args.duration)) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "Failed to encode report");
                return ExitCode::FAILURE;
            }
        }
    } else {
        report.print_summary();
    }

    ExitCode::SUCCESS
}
