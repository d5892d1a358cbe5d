use alloc::rc::Rc;
use core::cell::Cell;

use embassy_time::Instant;

/// Virtual time shared between simulated devices and their delay source.
#[derive(Debug, Clone, Default)]
pub struct Timebase {
    ns: Rc<Cell<u64>>,
}

impl Timebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ns(&self) -> u64 {
        self.ns.get()
    }

    pub fn now_us(&self) -> u64 {
        self.ns.get() / 1_000
    }

    /// Current virtual time as an Embassy instant.
    pub fn instant(&self) -> Instant {
        Instant::from_micros(self.now_us())
    }

    pub fn advance_ns(&self, ns: u64) {
        self.ns.set(self.ns.get() + ns);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_ns(ms * 1_000_000);
    }

    /// A delay source that moves this timebase instead of sleeping.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            timebase: self.clone(),
        }
    }
}

/// Delay that advances a [`Timebase`] and returns immediately.
#[derive(Debug, Clone)]
pub struct SimDelay {
    timebase: Timebase,
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timebase.advance_ns(ns as u64);
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.timebase.advance_ns(ns as u64);
    }
}
