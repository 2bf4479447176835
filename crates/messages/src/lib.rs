//! Exchange payloads for the contact protocol.
//!
//! Nodes never read each other's internals. Everything one node learns about
//! a peer arrives as one of these payloads, captured by the host at the
//! moment of contact:
//!
//! - [`PredictabilityVector`]: the peer's aged delivery predictabilities
//! - [`ReceiptDigest`]: the peer's delivery receipts
//! - [`CongestionReport`]: the peer's congestion value and traffic counters
//! - [`PeerSnapshot`]: all of the above plus the peer's holdings

pub mod exchange;

pub use exchange::{
    CongestionReport, PeerSnapshot, PredictabilityVector, Receipt, ReceiptDigest,
    PROTOCOL_VERSION,
};

/// A payload that crosses the contact boundary.
pub trait ExchangeMessage {
    /// Stable identifier for this payload type, used in logs and traces.
    fn message_type_id() -> &'static str;
}
