//! Bounded message buffer.

use crate::AdmissionError;
use ferry_types::{Message, MessageId};
use indexmap::IndexMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Slot {
    message: Message,
    /// Position in arrival order, used to break arrival-time ties.
    arrival_seq: u64,
    /// Outgoing transfers currently carrying this message.
    transfers: u32,
}

/// Bounded, arrival-ordered message storage.
///
/// Iteration yields messages in the order they entered the buffer. `used`
/// always equals the sum of stored message sizes and never exceeds
/// `capacity`.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    capacity: u64,
    used: u64,
    slots: IndexMap<MessageId, Slot>,
    next_seq: u64,
}

impl MessageBuffer {
    /// Create an empty buffer of `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            used: 0,
            slots: IndexMap::new(),
            next_seq: 0,
        }
    }

    /// Store a message. Fails without side effects if the id is already
    /// present or the free space is too small.
    pub fn insert(&mut self, message: Message) -> Result<(), AdmissionError> {
        if self.slots.contains_key(&message.id) {
            return Err(AdmissionError::Duplicate(message.id));
        }
        if message.size > self.free_space() {
            return Err(AdmissionError::NoRoom {
                size: message.size,
                free: self.free_space(),
            });
        }

        self.used += message.size;
        let arrival_seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(
            message.id,
            Slot {
                message,
                arrival_seq,
                transfers: 0,
            },
        );
        Ok(())
    }

    /// Remove a message, releasing its space. Transfer bookkeeping for the
    /// message is discarded with it.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let slot = self.slots.shift_remove(id)?;
        self.used -= slot.message.size;
        Some(slot.message)
    }

    /// Get a buffered message.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.slots.get(id).map(|slot| &slot.message)
    }

    /// Get a buffered message for metadata updates.
    ///
    /// The size must not be changed through this reference.
    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.slots.get_mut(id).map(|slot| &mut slot.message)
    }

    /// Check if a message is buffered.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.slots.contains_key(id)
    }

    /// Iterate over buffered messages in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.slots.values().map(|slot| &slot.message)
    }

    /// Ids of buffered messages in arrival order.
    pub fn ids(&self) -> impl Iterator<Item = &MessageId> {
        self.slots.keys()
    }

    /// Arrival sequence number of a message.
    pub fn arrival_seq(&self, id: &MessageId) -> Option<u64> {
        self.slots.get(id).map(|slot| slot.arrival_seq)
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently occupied.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Bytes currently free.
    pub fn free_space(&self) -> u64 {
        self.capacity - self.used
    }

    /// Total size of messages that are not mid-transfer.
    pub fn evictable_space(&self) -> u64 {
        self.slots
            .values()
            .filter(|slot| slot.transfers == 0)
            .map(|slot| slot.message.size)
            .sum()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mark an outgoing transfer of `id` as started.
    ///
    /// Returns false if the message is not buffered.
    pub fn begin_transfer(&mut self, id: &MessageId) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.transfers += 1;
                true
            }
            None => false,
        }
    }

    /// Mark an outgoing transfer of `id` as finished (completed or aborted).
    pub fn end_transfer(&mut self, id: &MessageId) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.transfers = slot.transfers.saturating_sub(1);
        }
    }

    /// Check if `id` is being sent on any connection.
    pub fn is_transferring(&self, id: &MessageId) -> bool {
        self.slots.get(id).is_some_and(|slot| slot.transfers > 0)
    }

    /// Ids of expired messages, without removing them.
    pub fn expired_ids(&self, now: Duration) -> Vec<MessageId> {
        self.slots
            .values()
            .filter(|slot| slot.message.is_expired(now))
            .map(|slot| slot.message.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_types::NodeId;

    fn message(id: u64, size: u64, ttl: u64) -> Message {
        Message::new(
            MessageId(id),
            NodeId(0),
            NodeId(1),
            size,
            Duration::from_secs(ttl),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_insert_and_remove_track_space() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 30, 60)).unwrap();
        buffer.insert(message(2, 50, 60)).unwrap();
        assert_eq!(buffer.used(), 80);
        assert_eq!(buffer.free_space(), 20);

        assert_eq!(
            buffer.insert(message(3, 30, 60)),
            Err(AdmissionError::NoRoom { size: 30, free: 20 })
        );
        assert_eq!(
            buffer.insert(message(1, 10, 60)),
            Err(AdmissionError::Duplicate(MessageId(1)))
        );

        assert_eq!(buffer.remove(&MessageId(1)).map(|m| m.size), Some(30));
        assert_eq!(buffer.free_space(), 50);
        assert!(buffer.remove(&MessageId(1)).is_none());
    }

    #[test]
    fn test_arrival_order_is_preserved() {
        let mut buffer = MessageBuffer::new(100);
        for id in [5, 2, 9] {
            buffer.insert(message(id, 10, 60)).unwrap();
        }
        buffer.remove(&MessageId(2));
        buffer.insert(message(2, 10, 60)).unwrap();

        let ids: Vec<_> = buffer.ids().copied().collect();
        assert_eq!(ids, vec![MessageId(5), MessageId(9), MessageId(2)]);
        assert!(buffer.arrival_seq(&MessageId(2)) > buffer.arrival_seq(&MessageId(9)));
    }

    #[test]
    fn test_transfer_tracking() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 30, 60)).unwrap();
        buffer.insert(message(2, 20, 60)).unwrap();

        assert!(buffer.begin_transfer(&MessageId(1)));
        assert!(buffer.begin_transfer(&MessageId(1)));
        assert!(!buffer.begin_transfer(&MessageId(7)));
        assert_eq!(buffer.evictable_space(), 20);

        buffer.end_transfer(&MessageId(1));
        assert!(buffer.is_transferring(&MessageId(1)));
        buffer.end_transfer(&MessageId(1));
        assert!(!buffer.is_transferring(&MessageId(1)));
        assert_eq!(buffer.evictable_space(), 50);
    }

    #[test]
    fn test_expired_ids() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 10, 30)).unwrap();
        buffer.insert(message(2, 10, 90)).unwrap();
        buffer.begin_transfer(&MessageId(1));

        assert!(buffer.expired_ids(Duration::from_secs(29)).is_empty());
        assert_eq!(buffer.expired_ids(Duration::from_secs(30)), vec![MessageId(1)]);
        // Listing does not remove.
        assert_eq!(buffer.used(), 20);
    }
}
