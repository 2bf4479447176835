//! Message storage and eviction.
//!
//! - [`MessageBuffer`]: bounded, arrival-ordered storage with per-message
//!   transfer tracking
//! - [`EvictionPolicy`]: decides which messages to sacrifice for space
//! - [`make_room_for`]: all-or-nothing eviction for an incoming message

mod buffer;
mod error;
mod eviction;

pub use buffer::MessageBuffer;
pub use error::AdmissionError;
pub use eviction::{make_room_for, EvictionPolicy, OldestFirst};
