//! Single-slot event mailbox between interrupt handlers and the coordinator
//!
//! Pushing overwrites whatever is unread: the newest event wins. A separate
//! last-writer-wins signal carries a record for the blocking reader, so the
//! coordinator's polling and a blocked reader never consume each other's
//! events.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::{EventRecord, InputEvent};

pub struct EventChannel {
    slot: Mutex<Cell<InputEvent>>,
    record: Signal<CriticalSectionRawMutex, EventRecord>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    /// An empty channel, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(InputEvent::None)),
            record: Signal::new(),
        }
    }

    /// Store `event`, replacing any unread one, and wake a blocked reader
    /// for rotations and presses. Safe to call from interrupt context.
    pub fn push(&self, event: InputEvent) {
        critical_section::with(|cs| self.slot.borrow(cs).set(event));
        if let Some(record) = EventRecord::from_event(event) {
            self.record.signal(record);
        }
    }

    /// Take the pending event, leaving the slot empty.
    pub fn pop(&self) -> InputEvent {
        critical_section::with(|cs| self.slot.borrow(cs).replace(InputEvent::None))
    }

    /// Wait until a rotation or press is recorded, then take it.
    pub async fn wait_record(&self) -> EventRecord {
        self.record.wait().await
    }

    /// Take the recorded event without waiting, or `EventRecord::None`.
    pub fn try_take_record(&self) -> EventRecord {
        self.record.try_take().unwrap_or_default()
    }
}
