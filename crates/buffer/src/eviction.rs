//! Eviction policies.

use crate::{AdmissionError, MessageBuffer};
use ferry_types::{Message, MessageId};
use tracing::debug;

/// Decides the order in which buffered messages are sacrificed.
pub trait EvictionPolicy {
    /// Evictable messages in the order they should be removed, first victim
    /// first. Messages mid-transfer must not appear.
    fn eviction_order(&self, buffer: &MessageBuffer) -> Vec<MessageId>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Evict the message that has been buffered longest.
///
/// Order is by arrival time into this buffer; equal arrival times fall back
/// to insertion order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl EvictionPolicy for OldestFirst {
    fn eviction_order(&self, buffer: &MessageBuffer) -> Vec<MessageId> {
        let mut candidates: Vec<_> = buffer
            .iter()
            .filter(|m| !buffer.is_transferring(&m.id))
            .map(|m| (m.received_at, buffer.arrival_seq(&m.id).unwrap_or(u64::MAX), m.id))
            .collect();
        candidates.sort();
        candidates.into_iter().map(|(_, _, id)| id).collect()
    }

    fn name(&self) -> &'static str {
        "oldest_first"
    }
}

/// Free at least `size` bytes in `buffer`, evicting by `policy`.
///
/// Either enough space is freed and every evicted message is returned (the
/// caller counts each as a drop), or nothing is touched and an error is
/// returned. Messages mid-transfer are never evicted.
pub fn make_room_for(
    size: u64,
    buffer: &mut MessageBuffer,
    policy: &dyn EvictionPolicy,
) -> Result<Vec<Message>, AdmissionError> {
    if size > buffer.capacity() {
        return Err(AdmissionError::TooLarge {
            size,
            capacity: buffer.capacity(),
        });
    }

    let free = buffer.free_space();
    if free >= size {
        return Ok(Vec::new());
    }

    // Plan the full set of victims before touching the buffer.
    let mut reclaimed = free;
    let mut victims = Vec::new();
    for id in policy.eviction_order(buffer) {
        if reclaimed >= size {
            break;
        }
        if buffer.is_transferring(&id) {
            continue;
        }
        if let Some(message) = buffer.get(&id) {
            reclaimed += message.size;
            victims.push(id);
        }
    }

    if reclaimed < size {
        return Err(AdmissionError::InsufficientEvictableSpace {
            size,
            free,
            evictable: buffer.evictable_space(),
        });
    }

    let evicted: Vec<Message> = victims.iter().filter_map(|id| buffer.remove(id)).collect();
    debug!(
        policy = policy.name(),
        size,
        evicted = evicted.len(),
        free = buffer.free_space(),
        "Made room in buffer"
    );
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_types::NodeId;
    use std::time::Duration;

    fn message(id: u64, size: u64, arrived: u64) -> Message {
        Message::new(
            MessageId(id),
            NodeId(0),
            NodeId(1),
            size,
            Duration::from_secs(10_000),
            Duration::from_secs(arrived),
        )
    }

    #[test]
    fn test_evicts_oldest_until_enough_space() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 20, 0)).unwrap();
        buffer.insert(message(2, 30, 10)).unwrap();
        buffer.insert(message(3, 50, 20)).unwrap();
        buffer.begin_transfer(&MessageId(1));
        assert_eq!(buffer.free_space(), 0);

        let evicted = make_room_for(40, &mut buffer, &OldestFirst).unwrap();
        let ids: Vec<_> = evicted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(2), MessageId(3)]);
        assert_eq!(buffer.free_space(), 80);
        assert!(buffer.contains(&MessageId(1)));
    }

    #[test]
    fn test_no_eviction_when_space_is_free() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 30, 0)).unwrap();
        assert!(make_room_for(70, &mut buffer, &OldestFirst)
            .unwrap()
            .is_empty());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_too_large() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 30, 0)).unwrap();
        assert_eq!(
            make_room_for(101, &mut buffer, &OldestFirst),
            Err(AdmissionError::TooLarge {
                size: 101,
                capacity: 100
            })
        );
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_failure_never_evicts_partially() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 60, 0)).unwrap();
        buffer.insert(message(2, 30, 10)).unwrap();
        buffer.begin_transfer(&MessageId(1));

        let result = make_room_for(50, &mut buffer, &OldestFirst);
        assert_eq!(
            result,
            Err(AdmissionError::InsufficientEvictableSpace {
                size: 50,
                free: 10,
                evictable: 30
            })
        );
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.used(), 90);
    }

    #[test]
    fn test_arrival_ties_follow_insertion_order() {
        let mut buffer = MessageBuffer::new(30);
        buffer.insert(message(7, 10, 5)).unwrap();
        buffer.insert(message(3, 10, 5)).unwrap();
        buffer.insert(message(5, 10, 5)).unwrap();

        let order = OldestFirst.eviction_order(&buffer);
        assert_eq!(order, vec![MessageId(7), MessageId(3), MessageId(5)]);
    }

    #[test]
    fn test_policy_skips_messages_in_transfer() {
        let mut buffer = MessageBuffer::new(100);
        buffer.insert(message(1, 10, 0)).unwrap();
        buffer.insert(message(2, 10, 1)).unwrap();
        buffer.begin_transfer(&MessageId(1));
        assert_eq!(OldestFirst.eviction_order(&buffer), vec![MessageId(2)]);
    }
}
