//! Text endpoints exposing the sensor, the clock and the event stream
//!
//! Each endpoint renders into a fixed-capacity string so a board layer can
//! forward it to whatever transport it has (a console, a character device, a
//! debug channel) without allocating.

use core::fmt::Write;

use heapless::String;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::clock_value::{COMPACT_LEN, ClockValue, ParseError};
use crate::input::{EventChannel, EventRecord};
use crate::protocol::{ClockSource, HumiditySensor, ProtocolError};

/// `YYYYMMDDhhmmss` plus a newline.
pub const CLOCK_TEXT_LEN: usize = COMPACT_LEN + 1;
pub const SENSOR_TEXT_LEN: usize = 96;
pub const EVENT_TEXT_LEN: usize = 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointError {
    #[error("malformed clock string: {0}")]
    Parse(#[from] ParseError),
    #[error("clock access failed: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Read and set the clock as `YYYYMMDDhhmmss` text.
pub struct ClockEndpoint<C> {
    clock: C,
    read_back: bool,
}

impl<C: ClockSource> ClockEndpoint<C> {
    /// With `read_back` set, every write is confirmed by reading the chip
    /// again.
    pub fn new(clock: C, read_back: bool) -> Self {
        Self { clock, read_back }
    }

    pub async fn read(&mut self) -> Result<String<CLOCK_TEXT_LEN>, EndpointError> {
        let value = self.clock.read_clock().await?;
        let mut text = String::new();
        // Capacity fits the fixed-width form exactly
        let _ = value.write_compact(&mut text);
        let _ = text.push('\n');
        Ok(text)
    }

    /// Parse `input` and write it to the clock, returning the number of bytes
    /// consumed. Surrounding whitespace is ignored.
    pub async fn write(&mut self, input: &[u8]) -> Result<usize, EndpointError> {
        let value = ClockValue::parse_compact(input).inspect_err(|e| {
            warn!("Rejected clock string: {}", e);
        })?;

        if self.read_back {
            self.clock.write_verified(value).await?;
        } else {
            self.clock.write_clock(value).await?;
        }
        info!("Clock set to {} via endpoint", value);
        Ok(input.len())
    }

    pub fn into_inner(self) -> C {
        self.clock
    }
}

/// Human-readable climate reading.
pub struct SensorEndpoint<S> {
    sensor: S,
}

impl<S: HumiditySensor> SensorEndpoint<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    /// Run a fresh acquisition. Failures are reported in the text itself.
    pub async fn read(&mut self) -> String<SENSOR_TEXT_LEN> {
        let mut text = String::new();
        let _ = match self.sensor.read_sensor().await {
            Ok(reading) => writeln!(
                text,
                "temp: {} c humi: {} %",
                reading.temperature, reading.humidity
            ),
            Err(e) => writeln!(text, "DHT11 read error: {}", e),
        };
        text
    }
}

/// Blocking reader over the event channel's record signal.
pub struct EventEndpoint<'a> {
    channel: &'a EventChannel,
}

impl<'a> EventEndpoint<'a> {
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel }
    }

    /// Wait for the next rotation or press.
    pub async fn read(&self) -> String<EVENT_TEXT_LEN> {
        format_record(self.channel.wait_record().await)
    }

    /// Take the latest record without waiting; `NONE` when nothing happened.
    pub fn try_read(&self) -> String<EVENT_TEXT_LEN> {
        format_record(self.channel.try_take_record())
    }
}

fn format_record(record: EventRecord) -> String<EVENT_TEXT_LEN> {
    let mut text = String::new();
    let _ = writeln!(text, "{}", record.as_str());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock_value::ClockField;
    use crate::input::InputEvent;
    use crate::protocol::{Dht11Sensor, Ds1302Clock, SensorReading};
    use crate::sim::{SimDht11, SimDs1302, Timebase};
    use embassy_futures::block_on;

    fn chip_endpoint(
        chip: &SimDs1302,
        timebase: &Timebase,
        read_back: bool,
    ) -> ClockEndpoint<impl ClockSource> {
        let (ce, clk, dat) = chip.pins();
        ClockEndpoint::new(Ds1302Clock::new(ce, clk, dat, timebase.delay()), read_back)
    }

    #[test]
    fn test_clock_read_is_compact_line() {
        let timebase = Timebase::new();
        let chip = SimDs1302::new();
        chip.set_time(&ClockValue::from_calendar(2024, 2, 29, 23, 59, 58).unwrap());
        let mut endpoint = chip_endpoint(&chip, &timebase, false);

        let text = block_on(endpoint.read()).unwrap();
        assert_eq!(text.as_str(), "20240229235958\n");
    }

    #[test]
    fn test_clock_write_trims_and_sets() {
        let timebase = Timebase::new();
        let chip = SimDs1302::new();
        let mut endpoint = chip_endpoint(&chip, &timebase, true);

        let input = b"20250704120030\n";
        assert_eq!(block_on(endpoint.write(input)), Ok(input.len()));
        let stored = chip.time().unwrap();
        assert_eq!(stored.to_string(), "2025-07-04 12:00:30");
        // 2025-07-04 is a Friday
        assert_eq!(stored.weekday, 5);
    }

    #[test]
    fn test_clock_write_rejects_invalid_month() {
        let timebase = Timebase::new();
        let chip = SimDs1302::new();
        let before = chip.registers();
        let mut endpoint = chip_endpoint(&chip, &timebase, false);

        assert_eq!(
            block_on(endpoint.write(b"20231350120000")),
            Err(EndpointError::Parse(ParseError::OutOfRange {
                field: ClockField::Month
            }))
        );
        assert_eq!(
            block_on(endpoint.write(b"2023")),
            Err(EndpointError::Parse(ParseError::WrongLength { len: 4 }))
        );
        assert_eq!(chip.registers(), before);
    }

    #[test]
    fn test_verified_write_detects_lost_write() {
        let timebase = Timebase::new();
        let chip = SimDs1302::new();
        chip.disconnect();
        let mut endpoint = chip_endpoint(&chip, &timebase, true);

        assert!(matches!(
            block_on(endpoint.write(b"20250704120030")),
            Err(EndpointError::Protocol(_))
        ));
    }

    #[test]
    fn test_sensor_text() {
        let timebase = Timebase::new();
        let sim = SimDht11::new(&timebase);
        sim.set_reading(SensorReading {
            temperature: 21,
            humidity: 35,
        });
        let mut endpoint = SensorEndpoint::new(Dht11Sensor::new(sim.line(), timebase.delay()));
        assert_eq!(block_on(endpoint.read()).as_str(), "temp: 21 c humi: 35 %\n");

        sim.set_silent(true);
        let text = block_on(endpoint.read());
        assert!(text.starts_with("DHT11 read error: "));
    }

    #[test]
    fn test_event_text() {
        let channel = EventChannel::new();
        let endpoint = EventEndpoint::new(&channel);
        assert_eq!(endpoint.try_read().as_str(), "NONE\n");

        channel.push(InputEvent::RotateCcw);
        assert_eq!(block_on(endpoint.read()).as_str(), "ROT -1\n");

        channel.push(InputEvent::ButtonDown);
        channel.push(InputEvent::RotateCw);
        // Only the latest record survives
        assert_eq!(endpoint.try_read().as_str(), "ROT +1\n");
    }
}
