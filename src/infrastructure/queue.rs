use std::collections::VecDeque;

/// Bounded FIFO of text frames waiting for an open socket.
///
/// Never holds more than `capacity` entries; admitting a message into a full
/// queue evicts the oldest one.
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<String>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append `message`, returning the evicted entry if the queue was full
    pub fn push(&mut self, message: String) -> Option<String> {
        if self.capacity == 0 {
            return Some(message);
        }
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Put a message back at the head after a failed transmit
    pub fn requeue_front(&mut self, message: String) {
        if self.messages.len() >= self.capacity {
            // A newer message took the slot; the stale one loses.
            return;
        }
        self.messages.push_front(message);
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}
