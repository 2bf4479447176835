//! Admission errors.

use ferry_types::MessageId;
use thiserror::Error;

/// Why a message could not be admitted to a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The message is larger than the whole buffer.
    #[error("message of {size}B exceeds buffer capacity of {capacity}B")]
    TooLarge { size: u64, capacity: u64 },

    /// Even evicting everything evictable would not free enough space.
    #[error("need {size}B but only {free}B free and {evictable}B evictable")]
    InsufficientEvictableSpace { size: u64, free: u64, evictable: u64 },

    /// Not enough free space to insert without eviction.
    #[error("need {size}B but only {free}B free")]
    NoRoom { size: u64, free: u64 },

    /// A copy of the message is already buffered.
    #[error("message {0} already buffered")]
    Duplicate(MessageId),
}
