//! Core types for the ferry routing engine.
//!
//! This crate provides the foundational types for the node architecture:
//!
//! - [`Event`]: All possible inputs to a node
//! - [`Action`]: All possible outputs from a node
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`TransferOutcome`]: The host's answer to a transfer request
//! - [`StateMachine`]: The trait every node implements
//!
//! # Architecture
//!
//! ```text
//! Host (clock, links, transfers) → Event → StateMachine::handle() → Actions → Host
//! ```
//!
//! The host owns time and topology. It delivers events in
//! `(time, priority, node, sequence)` order, executes the returned actions,
//! and converts their results back into events.

mod action;
mod event;
mod traits;

pub use action::{Action, DiscardReason};
pub use event::{Event, EventPriority, TransferOutcome};
pub use traits::StateMachine;
