//! Replica count control.
//!
//! Messages generated with an initial copy count spread by handing copies to
//! peers. Each completed hand-off shrinks the sender's remaining count by an
//! amount that depends on how congested the receiving peer reports itself.
//! An overloaded peer gets no more copies for the rest of the contact.

mod config;
mod controller;

pub use config::ReplicationConfig;
pub use controller::{ReplicationController, ReplicationDecision};
