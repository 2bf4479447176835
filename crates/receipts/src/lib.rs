//! Delivery receipts.
//!
//! When a message reaches its destination, the destination records a
//! receipt. Receipts spread by union at every contact, and any node that
//! learns one drops its own copy of the message and refuses new ones.

mod ledger;

pub use ledger::ReceiptLedger;
