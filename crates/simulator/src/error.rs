//! Simulator errors.

use ferry_simulation::SimulationError;
use ferry_types::ConfigError;
use thiserror::Error;

/// Errors that stop a simulator run before it starts.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The simulator settings failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The simulation refused the generated plan or workload.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// The latency histogram could not be created.
    #[error("metrics: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    /// A latency could not be recorded.
    #[error("metrics: {0}")]
    Latency(#[from] hdrhistogram::RecordError),
}
