//! Outbound event queue shared between the tick and the flush.
//!
//! Producers append from inside a tick; the flush swaps the whole queue for an
//! empty one under the lock and transmits the swapped-out contents.

use crate::protocol::EventEnvelope;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct QueueState {
    events: Vec<EventEnvelope>,
    priority: bool,
}

/// Cloneable handle to the pending outbound events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<QueueState>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: EventEnvelope) {
        self.lock().events.push(event);
    }

    /// Appends and marks the queue for immediate flush.
    pub fn push_priority(&self, event: EventEnvelope) {
        let mut state = self.lock();
        state.events.push(event);
        state.priority = true;
    }

    /// Drops everything queued so far. Returns how many events were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.events.len();
        state.events.clear();
        state.priority = false;
        dropped
    }

    /// Swaps the queue for an empty one and returns the contents.
    pub fn take_batch(&self) -> Vec<EventEnvelope> {
        let mut state = self.lock();
        state.priority = false;
        std::mem::take(&mut state.events)
    }

    pub fn has_priority(&self) -> bool {
        self.lock().priority
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}
