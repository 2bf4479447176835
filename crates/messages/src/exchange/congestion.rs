//! Congestion report.

use crate::ExchangeMessage;
use ferry_types::{CongestionSample, TrafficCounters};
use serde::{Deserialize, Serialize};

/// What a node tells its peers about its own congestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CongestionReport {
    /// Most recently recomputed congestion value.
    pub value: f64,
    /// The sample that produced `value`, if any recompute has happened yet.
    pub latest: Option<CongestionSample>,
    /// Traffic tallied since the last recompute.
    pub counters: TrafficCounters,
}

impl ExchangeMessage for CongestionReport {
    fn message_type_id() -> &'static str {
        "congestion.report"
    }
}
