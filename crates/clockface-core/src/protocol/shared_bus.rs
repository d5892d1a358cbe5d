//! Lock-guarded handles to the protocol channels
//!
//! The coordinator and the blocking endpoints both reach the same physical
//! lines. Each channel sits behind its own Embassy `Mutex`, and every handle
//! takes the lock for exactly one full transaction. The sensor's
//! interrupt-masked transfer runs inside the lock, never the reverse.
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use embassy_sync::mutex::Mutex;
//!
//! # fn wire<C: clockface_core::ClockSource>(chip: C) {
//! let bus: Mutex<CriticalSectionRawMutex, C> = Mutex::new(chip);
//! let for_coordinator = clockface_core::protocol::SharedClock::new(&bus);
//! let for_endpoint = for_coordinator;
//! # }
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use crate::clock_value::ClockValue;

use super::{ClockSource, HumiditySensor, ProtocolError, SensorReading, verify_read_back};

/// Shared handle to a sensor channel.
pub struct SharedSensor<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> SharedSensor<'a, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for SharedSensor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedSensor<'_, T> {}

impl<T: HumiditySensor> HumiditySensor for SharedSensor<'_, T> {
    async fn read_sensor(&mut self) -> Result<SensorReading, ProtocolError> {
        let mut sensor = self.bus.lock().await;
        sensor.read_sensor().await
    }
}

/// Shared handle to a clock channel.
pub struct SharedClock<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> SharedClock<'a, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for SharedClock<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedClock<'_, T> {}

impl<T: ClockSource> ClockSource for SharedClock<'_, T> {
    async fn read_clock(&mut self) -> Result<ClockValue, ProtocolError> {
        let mut clock = self.bus.lock().await;
        clock.read_clock().await
    }

    async fn write_clock(&mut self, value: ClockValue) -> Result<(), ProtocolError> {
        let mut clock = self.bus.lock().await;
        clock.write_clock(value).await
    }

    /// Write and read back under a single lock so no other caller can slip
    /// a write in between.
    async fn write_verified(&mut self, value: ClockValue) -> Result<(), ProtocolError> {
        let mut clock = self.bus.lock().await;
        clock.write_clock(value).await?;
        let stored = clock.read_clock().await?;
        verify_read_back(&value, &stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Ds1302Clock;
    use crate::sim::{SimDht11, SimDs1302, Timebase};
    use crate::protocol::Dht11Sensor;
    use embassy_futures::block_on;
    use embassy_futures::join::join;

    #[test]
    fn test_handles_share_one_clock() {
        let timebase = Timebase::new();
        let device = SimDs1302::new();
        let (ce, clk, dat) = device.pins();
        let bus = Mutex::new(Ds1302Clock::new(ce, clk, dat, timebase.delay()));

        let mut writer = SharedClock::new(&bus);
        let mut reader = writer;

        let value = ClockValue::from_calendar(2026, 10, 19, 9, 41, 0).unwrap();
        block_on(writer.write_verified(value)).unwrap();
        assert_eq!(block_on(reader.read_clock()), Ok(value));
    }

    #[test]
    fn test_verified_write_detects_lost_write() {
        let timebase = Timebase::new();
        let device = SimDs1302::new();
        device.disconnect();
        let (ce, clk, dat) = device.pins();
        let bus = Mutex::new(Ds1302Clock::new(ce, clk, dat, timebase.delay()));

        let mut clock = SharedClock::new(&bus);
        let value = ClockValue::from_calendar(2026, 10, 19, 9, 41, 0).unwrap();
        // The bytes go out, but the read-back is garbage
        assert!(block_on(clock.write_clock(value)).is_ok());
        assert!(block_on(clock.write_verified(value)).is_err());
    }

    #[test]
    fn test_concurrent_sensor_reads_are_serialized() {
        let timebase = Timebase::new();
        let device = SimDht11::new(&timebase);
        device.set_frame([0x23, 0x00, 0x15, 0x00, 0x38]);
        let bus = Mutex::new(Dht11Sensor::new(device.line(), timebase.delay()));

        let mut first = SharedSensor::new(&bus);
        let mut second = first;
        let (a, b) = block_on(join(first.read_sensor(), second.read_sensor()));
        assert_eq!(a, b);
        assert_eq!(a.map(|r| r.temperature), Ok(21));
    }
}
