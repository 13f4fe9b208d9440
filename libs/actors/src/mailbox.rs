//! Bounded FIFO Mailbox
//!
//! The mailbox is the runtime's only backpressure mechanism and its only
//! suspension point:
//!
//! - [`Mailbox::enqueue`] never blocks. The capacity check and the insert
//!   happen under one lock, so a producer either lands its message or gets
//!   it back immediately with [`EnqueueError::Full`].
//! - [`Mailbox::dequeue`] parks the single consumer thread on a condition
//!   variable until a message arrives or a stop is requested.
//!
//! Once a stop is requested the consumer keeps receiving everything still
//! queued (producers may keep adding to it); the first `dequeue` that finds
//! the queue empty closes the mailbox for good and returns `None`. Closing
//! and the emptiness check are atomic, so nothing accepted can be stranded.

use crate::messages::Message;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;

/// Why an enqueue was refused. The rejected item is handed back.
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError<T> {
    /// Queue is at capacity
    Full(T),
    /// Consumer has terminated; nothing will be read again
    Closed(T),
}

impl<T> EnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::Full(item) | EnqueueError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, EnqueueError::Full(_))
    }
}

impl<T> fmt::Display for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full(_) => write!(f, "mailbox is full"),
            EnqueueError::Closed(_) => write!(f, "mailbox is closed"),
        }
    }
}

struct MailboxState<T> {
    queue: VecDeque<T>,
    stopping: bool,
    closed: bool,
}

/// Bounded, thread-safe FIFO queue with a single blocking consumer
pub struct Mailbox<T = Message> {
    state: Mutex<MailboxState<T>>,
    available: Condvar,
    capacity: usize,
}

impl<T> Mailbox<T> {
    /// Create a mailbox; `capacity` never changes afterwards
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: VecDeque::with_capacity(capacity.min(1024)),
                stopping: false,
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append `item`, waking the consumer if it is parked
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EnqueueError::Closed(item));
        }
        if state.queue.len() >= self.capacity {
            return Err(EnqueueError::Full(item));
        }
        state.queue.push_back(item);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Take the oldest item, blocking while the queue is empty
    ///
    /// Returns `None` only after a stop was requested and the queue has been
    /// fully drained; the mailbox is closed from that point on.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some(item);
            }
            if state.stopping || state.closed {
                state.closed = true;
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Non-blocking check for queued items
    pub fn has_unread(&self) -> bool {
        !self.state.lock().queue.is_empty()
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopping
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Ask the consumer to finish the queue and then stop
    ///
    /// Returns `true` for the first request only.
    pub fn request_stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.stopping {
            return false;
        }
        state.stopping = true;
        drop(state);

        self.available.notify_all();
        true
    }

    /// Close immediately and discard everything still queued
    ///
    /// Returns how many items were dropped.
    pub fn abandon(&self) -> usize {
        let mut state = self.state.lock();
        state.stopping = true;
        state.closed = true;
        let dropped = state.queue.len();
        state.queue.clear();
        drop(state);

        self.available.notify_all();
        dropped
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mailbox")
            .field("capacity", &self.capacity)
            .field("queued", &state.queue.len())
            .field("stopping", &state.stopping)
            .field("closed", &state.closed)
            .finish()
    }
}
