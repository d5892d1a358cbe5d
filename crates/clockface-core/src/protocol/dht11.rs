//! Single-wire humidity/temperature sensor
//!
//! One acquisition is a wake pulse from the host followed by a sensor-driven
//! handshake and 40 data bits. A bit is a ~50 µs low phase followed by a high
//! phase of ~27 µs (`0`) or ~70 µs (`1`); the level 35 µs into the high phase
//! decides the bit. The payload is humidity (integer, fraction), temperature
//! (integer, fraction) and a checksum byte.

use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal_async::delay::DelayNs as AsyncDelay;
use log::debug;

use super::{BoundedWait, DualModeLine, HumiditySensor, ProtocolError};

const WAKE_LOW_MS: u32 = 20;
const RELEASE_HIGH_US: u32 = 30;
const INPUT_SETTLE_US: u32 = 2;
const BIT_SAMPLE_US: u32 = 35;

const HANDSHAKE_PHASES: u8 = 3;
const FRAME_BYTES: usize = 5;

/// Integer part of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    /// Degrees Celsius.
    pub temperature: u8,
    /// Percent relative humidity.
    pub humidity: u8,
}

/// Validate a raw frame and extract the integer readings.
pub fn decode_frame(frame: &[u8; FRAME_BYTES]) -> Result<SensorReading, ProtocolError> {
    let expected = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if expected != frame[4] {
        return Err(ProtocolError::ChecksumMismatch {
            expected,
            actual: frame[4],
        });
    }

    Ok(SensorReading {
        humidity: frame[0],
        temperature: frame[2],
    })
}

/// Wait until `line` reads `high`, failing with `Timeout { phase }`.
fn await_level<L, D>(
    line: &mut L,
    delay: &mut D,
    wait: BoundedWait,
    high: bool,
    phase: u8,
) -> Result<(), ProtocolError>
where
    L: DualModeLine,
    D: BlockingDelay,
{
    wait.poll_until(delay, || line.is_high() == high)
        .map(|_| ())
        .ok_or(ProtocolError::Timeout { phase })
}

/// Sensor driver owning its data line and a delay source.
///
/// The delay must implement both the blocking and the async `DelayNs`: the
/// 20 ms wake pulse yields to the executor while the microsecond-level
/// transfer busy-waits.
pub struct Dht11Sensor<L, D> {
    line: L,
    delay: D,
    wait: BoundedWait,
}

impl<L, D> Dht11Sensor<L, D>
where
    L: DualModeLine,
    D: BlockingDelay + AsyncDelay,
{
    pub fn new(line: L, delay: D) -> Self {
        Self {
            line,
            delay,
            wait: BoundedWait::SENSOR_LEVEL,
        }
    }

    /// Give the line back, for example to reuse it after shutdown.
    pub fn release(self) -> (L, D) {
        (self.line, self.delay)
    }

    async fn wake(&mut self) {
        self.line.set_as_output();
        self.line.set_low();
        AsyncDelay::delay_ms(&mut self.delay, WAKE_LOW_MS).await;
    }

    /// The timing-critical part, run with interrupts masked by the caller.
    fn transfer(&mut self) -> Result<[u8; FRAME_BYTES], ProtocolError> {
        let Self { line, delay, wait } = self;
        let wait = *wait;

        line.set_high();
        BlockingDelay::delay_us(delay, RELEASE_HIGH_US);
        line.set_as_input();
        BlockingDelay::delay_us(delay, INPUT_SETTLE_US);

        // Response: low 80 µs, high 80 µs, then low for the first bit
        await_level(line, delay, wait, false, 0)?;
        await_level(line, delay, wait, true, 1)?;
        await_level(line, delay, wait, false, 2)?;

        let mut frame = [0u8; FRAME_BYTES];
        for bit in 0..(FRAME_BYTES * 8) {
            let phase = HANDSHAKE_PHASES + 2 * bit as u8;
            await_level(line, delay, wait, true, phase)?;
            BlockingDelay::delay_us(delay, BIT_SAMPLE_US);
            if line.is_high() {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
            await_level(line, delay, wait, false, phase + 1)?;
        }

        Ok(frame)
    }
}

impl<L, D> HumiditySensor for Dht11Sensor<L, D>
where
    L: DualModeLine,
    D: BlockingDelay + AsyncDelay,
{
    async fn read_sensor(&mut self) -> Result<SensorReading, ProtocolError> {
        self.wake().await;

        // Interrupts stay masked for the whole transfer and are restored on
        // every exit, including timeouts.
        let frame = critical_section::with(|_| self.transfer());

        // Leave the line released whatever happened
        self.line.set_as_input();

        let reading = decode_frame(&frame?)?;
        debug!(
            "DHT11: {} C, {} %RH",
            reading.temperature, reading.humidity
        );
        Ok(reading)
    }
}
