//! Payloads exchanged when two nodes are in contact.

mod congestion;
mod predictability;
mod receipts;
mod snapshot;

pub use congestion::CongestionReport;
pub use predictability::PredictabilityVector;
pub use receipts::{Receipt, ReceiptDigest};
pub use snapshot::PeerSnapshot;

/// Version of the contact protocol spoken by this build.
///
/// Peers speaking a different version cannot be routed through: the engine
/// has no fallback for mixed-protocol networks.
pub const PROTOCOL_VERSION: u16 = 1;
