//! Delivery predictability for PRoPHET routing.
//!
//! Each node keeps a [`PredictabilityTable`]: for every other node it has
//! heard of, an estimate of how likely it is to deliver a message there. The
//! estimate grows on direct contact, grows transitively through peers, and
//! decays with time.

mod config;
mod table;

pub use config::PredictabilityConfig;
pub use table::PredictabilityTable;
