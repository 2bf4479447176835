//! Forwarding decisions.
//!
//! For every open contact the [`ForwardingScheduler`] decides which buffered
//! messages the peer should get and in what order, then feeds them to the
//! host one transfer at a time.
//!
//! # Ranking
//!
//! A message is offered to a peer when the peer is its destination, or when
//! the peer's delivery predictability for the destination is strictly
//! greater than ours (GRTRMax). Candidates are ordered by the peer's
//! predictability, highest first; ties are broken by a [`QueueDiscipline`].
//!
//! # Per-contact lifecycle
//!
//! ```text
//! Idle → Exchanging → Ranking → Transferring → Idle
//! ```

mod config;
mod contact;
mod discipline;
mod scheduler;

pub use config::{ForwardingConfig, QueueMode};
pub use contact::{Candidate, ContactPhase, ContactState};
pub use discipline::{ArrivalOrder, QueueDiscipline, RandomOrder, ShortestTtlFirst};
pub use scheduler::{ForwardingScheduler, RoutingView};
