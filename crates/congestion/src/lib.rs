//! Per-node congestion estimation.
//!
//! A node tallies drops, receptions and local generations between
//! recomputes. Every update interval the ratio of drops to intake is folded
//! into an exponentially-weighted moving average. The resulting value is
//! what peers read to decide how aggressively to hand this node replicas.

mod config;
mod estimator;

pub use config::CongestionConfig;
pub use estimator::CongestionEstimator;
