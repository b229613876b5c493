//! Event scheduler.
//!
//! Events are kept sorted by absolute T-state. Events due at the same
//! T-state fire in the order they were scheduled. The scheduler knows
//! nothing about the machine: `advance` hands each due event to an
//! [`EventHandler`], which may schedule further events.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Start of a new frame: raise INT and re-arm.
    Frame,
    /// End of the INT pulse.
    InterruptEnd,
    /// Next level change of the tape signal.
    TapeEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Absolute T-state at which the event is due.
    pub time: u64,
    pub kind: EventKind,
}

/// Receives events as they fall due.
pub trait EventHandler {
    fn handle(&mut self, event: Event, scheduler: &mut Scheduler);
}

#[derive(Debug, Default)]
pub struct Scheduler {
    events: VecDeque<Event>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `kind` to fire at `time`.
    pub fn schedule(&mut self, time: u64, kind: EventKind) {
        let pos = self
            .events
            .iter()
            .position(|e| e.time > time)
            .unwrap_or(self.events.len());
        self.events.insert(pos, Event { time, kind });
    }

    /// Drop every pending event of `kind`.
    pub fn remove(&mut self, kind: EventKind) {
        self.events.retain(|e| e.kind != kind);
    }

    #[must_use]
    pub fn is_scheduled(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    /// When the earliest pending event is due.
    #[must_use]
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.front().map(|e| e.time)
    }

    /// Fire every event due at or before `now`, earliest first. Events the
    /// handler schedules are fired in the same call if they are already due.
    ///
    /// Returns the number of events fired.
    pub fn advance(&mut self, now: u64, handler: &mut impl EventHandler) -> usize {
        let mut fired = 0;
        while self.next_event_time().is_some_and(|time| time <= now) {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            handler.handle(event, self);
            fired += 1;
        }
        fired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
