//! Bounded, age-limited buffer for outbound messages
//!
//! Messages produced while the channel is down land here and are flushed in
//! order on the next successful connect. The queue drops the oldest entry
//! when full and silently discards entries that outlive `max_age` by drain
//! time.

use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// One buffered outbound message
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// The caller-provided payload, transmitted verbatim on drain
    pub payload: Value,
    /// When the message entered the queue
    pub enqueued_at: Instant,
}

/// Bounded FIFO of outbound messages awaiting a connection
#[derive(Debug)]
pub struct MessageQueue {
    entries: VecDeque<QueuedMessage>,
    max_size: usize,
    max_age: Duration,
}

impl MessageQueue {
    /// Create a queue with the given capacity and entry lifetime
    pub fn new(max_size: usize, max_age: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size.min(64)),
            max_size,
            max_age,
        }
    }

    /// Buffer a payload, evicting the oldest entry when at capacity
    pub fn enqueue(&mut self, payload: Value) {
        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
            debug!("message queue full, dropped oldest entry");
        }
        self.entries.push_back(QueuedMessage {
            payload,
            enqueued_at: Instant::now(),
        });
    }

    /// Empty the queue, returning payloads still young enough to send (in
    /// original order) and the number of expired entries discarded
    pub fn drain_fresh(&mut self) -> (Vec<Value>, usize) {
        let mut fresh = Vec::with_capacity(self.entries.len());
        let mut expired = 0;
        for entry in self.entries.drain(..) {
            if entry.enqueued_at.elapsed() < self.max_age {
                fresh.push(entry.payload);
            } else {
                expired += 1;
            }
        }
        (fresh, expired)
    }

    /// Number of buffered messages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no messages
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
