//! Ferry Simulator
//!
//! A long-running workload simulator built on top of the simulation framework.
//! Runs a network of routing nodes over a random contact plan and reports
//! delivery, overhead, latency and per-node congestion.
//!
//! # Architecture
//!
//! The simulator builds on `ferry-simulation` to provide:
//!
//! - **Contact generation**: seeded random encounters between every pair
//! - **Workload Generation**: configurable message generators
//! - **Metrics Collection**: delivery ratio, latency percentiles, congestion history
//! - **Configuration**: serde-loadable setup for various scenarios
//!
//! # Example
//!
//! ```ignore
//! use ferry_simulator::{Simulator, SimulatorConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new(20).with_seed(42);
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run_for(Duration::from_secs(3_600))?;
//!
//! println!("Delivery: {:.2}", report.delivery_ratio);
//! println!("P99 latency: {:?}", report.p99_latency());
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod workload;

pub use config::{SimulatorConfig, WorkloadConfig};
pub use error::SimulatorError;
pub use metrics::{LatencySummary, MetricsCollector, NodeReport, SimulationReport};
pub use runner::Simulator;
pub use workload::{UniformWorkload, WorkloadGenerator};
