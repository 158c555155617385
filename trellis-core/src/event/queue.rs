//! Bounded event FIFO
//!
//! The queue is the only structure shared between interrupt handlers and
//! the main loop. Every access runs inside a short critical section, so
//! `post` is callable from any context through a shared reference and the
//! queue can live in a `static`.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::Deque;

use super::Event;

/// Event queue capacity
pub const EVENT_QUEUE_SIZE: usize = 32;

/// Fixed-capacity ring buffer of events
pub struct EventQueue {
    events: Mutex<RefCell<Deque<Event, EVENT_QUEUE_SIZE>>>,
    dropped: Mutex<Cell<u32>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(RefCell::new(Deque::new())),
            dropped: Mutex::new(Cell::new(0)),
        }
    }

    /// Append an event
    ///
    /// Returns false and drops the event if the queue is full. Producers
    /// must tolerate drops.
    pub fn post(&self, event: Event) -> bool {
        let accepted = critical_section::with(|cs| {
            self.events.borrow_ref_mut(cs).push_back(event).is_ok()
        });
        if !accepted {
            critical_section::with(|cs| {
                let dropped = self.dropped.borrow(cs);
                dropped.set(dropped.get().wrapping_add(1));
            });
            warn!("event queue full, dropped {}", event.kind);
        }
        accepted
    }

    /// Remove the oldest event
    pub fn take(&self) -> Option<Event> {
        critical_section::with(|cs| self.events.borrow_ref_mut(cs).pop_front())
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.events.borrow_ref(cs).len())
    }

    /// Check if no events are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }

    /// Discard every queued event
    pub fn clear(&self) {
        critical_section::with(|cs| self.events.borrow_ref_mut(cs).clear());
    }
}
