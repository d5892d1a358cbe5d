//! Bit-banged peripheral protocols
//!
//! Two channels live here: the single-wire humidity/temperature sensor and the
//! 3-wire real-time clock chip. Both are driven by toggling GPIO lines with
//! microsecond delays, and both are reached by the rest of the crate only
//! through the [`HumiditySensor`] and [`ClockSource`] traits.

pub mod bcd;
pub mod dht11;
pub mod ds1302;
pub mod line;
pub mod shared_bus;

pub use dht11::{Dht11Sensor, SensorReading};
pub use ds1302::Ds1302Clock;
pub use line::DualModeLine;
pub use shared_bus::{SharedClock, SharedSensor};

use embedded_hal::delay::DelayNs;
use thiserror_no_std::Error;

use crate::clock_value::{ClockField, ClockValue};

/// Errors raised by either protocol channel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// A bounded wait-for-level step ran out of polls.
    ///
    /// Phases 0..=2 are the sensor handshake; data bit `n` waits in phases
    /// `3 + 2n` (line high) and `4 + 2n` (line low).
    #[error("line did not reach the expected level in phase {phase}")]
    Timeout { phase: u8 },
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("{field} out of range")]
    Range { field: ClockField },
    #[error("bus transaction could not complete")]
    Transport,
    #[error("clock read-back differs from the written value")]
    VerifyMismatch,
}

/// Busy-wait primitive bounded by a poll interval and a maximum poll count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedWait {
    pub poll_us: u32,
    pub max_polls: u32,
}

impl BoundedWait {
    /// 250 polls of 1 µs, the budget of every sensor level wait.
    pub const SENSOR_LEVEL: Self = Self {
        poll_us: 1,
        max_polls: 250,
    };

    /// Poll `ready` until it returns true, sleeping `poll_us` between polls.
    ///
    /// Returns the number of polls that failed before success, or `None`
    /// once the budget is exhausted.
    pub fn poll_until<D, F>(&self, delay: &mut D, mut ready: F) -> Option<u32>
    where
        D: DelayNs,
        F: FnMut() -> bool,
    {
        let mut polls = 0;
        loop {
            if ready() {
                return Some(polls);
            }
            if polls == self.max_polls {
                return None;
            }
            delay.delay_us(self.poll_us);
            polls += 1;
        }
    }
}

/// A humidity/temperature source.
pub trait HumiditySensor {
    /// Run one complete acquisition.
    fn read_sensor(&mut self) -> impl Future<Output = Result<SensorReading, ProtocolError>>;
}

/// A real-time clock that can be read and set.
pub trait ClockSource {
    fn read_clock(&mut self) -> impl Future<Output = Result<ClockValue, ProtocolError>>;

    /// Write every field. Success means all bytes were sent; the chip gives
    /// no acknowledgement.
    fn write_clock(&mut self, value: ClockValue)
    -> impl Future<Output = Result<(), ProtocolError>>;

    /// Write, then read back and compare everything down to the minute.
    fn write_verified(
        &mut self,
        value: ClockValue,
    ) -> impl Future<Output = Result<(), ProtocolError>> {
        async move {
            self.write_clock(value).await?;
            let stored = self.read_clock().await?;
            verify_read_back(&value, &stored)
        }
    }
}

/// Compare a read-back against the written value. A minute rollover between
/// the write and the read is tolerated.
pub(crate) fn verify_read_back(written: &ClockValue, stored: &ClockValue) -> Result<(), ProtocolError> {
    if stored.same_minute(written) || stored.same_minute(&written.next_second()) {
        Ok(())
    } else {
        Err(ProtocolError::VerifyMismatch)
    }
}
