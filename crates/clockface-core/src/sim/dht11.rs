use alloc::rc::Rc;
use core::cell::RefCell;

use crate::protocol::{DualModeLine, SensorReading};

use super::Timebase;

/// Minimum host low time the sensor accepts as a start signal.
const WAKE_MIN_NS: u64 = 18_000_000;

const HANDSHAKE_US: [(u64, bool); 3] = [(20, true), (80, false), (80, true)];
const BIT_LOW_US: u64 = 50;
const BIT_ZERO_HIGH_US: u64 = 27;
const BIT_ONE_HIGH_US: u64 = 70;
const TRAILER_LOW_US: u64 = 50;
const FRAME_BITS: u8 = 40;

#[derive(Debug)]
struct State {
    timebase: Timebase,
    driving: bool,
    host_level: bool,
    low_since: Option<u64>,
    armed: bool,
    response_start: Option<u64>,
    frame: [u8; 5],
    silent: bool,
    stop_after_bits: Option<u8>,
}

impl State {
    fn level(&self) -> bool {
        if self.driving {
            return self.host_level;
        }
        match self.response_start {
            Some(start) => response_level(
                &self.frame,
                self.stop_after_bits,
                self.timebase.now_ns() - start,
            ),
            // Pull-up
            None => true,
        }
    }
}

/// Level of the sensor's reply `elapsed_ns` after the host released the line.
/// With `stop_after` set the sensor lets go of the line for good after that
/// many bits.
fn response_level(frame: &[u8; 5], stop_after: Option<u8>, elapsed_ns: u64) -> bool {
    let mut remaining = elapsed_ns;
    let mut within = |us: u64| {
        let ns = us * 1_000;
        if remaining < ns {
            true
        } else {
            remaining -= ns;
            false
        }
    };

    for (us, level) in HANDSHAKE_US {
        if within(us) {
            return level;
        }
    }
    let bits = stop_after.map_or(FRAME_BITS, |n| n.min(FRAME_BITS));
    for bit in 0..bits as usize {
        let one = frame[bit / 8] & (0x80 >> (bit % 8)) != 0;
        if within(BIT_LOW_US) {
            return false;
        }
        if within(if one { BIT_ONE_HIGH_US } else { BIT_ZERO_HIGH_US }) {
            return true;
        }
    }
    if bits < FRAME_BITS {
        return true;
    }
    if within(TRAILER_LOW_US) {
        return false;
    }
    true
}

/// Simulated single-wire humidity/temperature sensor.
///
/// The sensor answers a host low pulse of at least 18 ms, once the host
/// releases the line, with the handshake and the configured 5-byte frame.
#[derive(Debug, Clone)]
pub struct SimDht11 {
    state: Rc<RefCell<State>>,
}

impl SimDht11 {
    pub fn new(timebase: &Timebase) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                timebase: timebase.clone(),
                driving: false,
                host_level: true,
                low_since: None,
                armed: false,
                response_start: None,
                frame: [0; 5],
                silent: false,
                stop_after_bits: None,
            })),
        }
    }

    /// Raw frame sent on the next acquisition, checksum byte included.
    pub fn set_frame(&self, frame: [u8; 5]) {
        self.state.borrow_mut().frame = frame;
    }

    /// Frame carrying `reading` with a correct checksum.
    pub fn set_reading(&self, reading: SensorReading) {
        let checksum = reading.humidity.wrapping_add(reading.temperature);
        self.set_frame([reading.humidity, 0, reading.temperature, 0, checksum]);
    }

    /// A silent sensor never answers the wake pulse.
    pub fn set_silent(&self, silent: bool) {
        self.state.borrow_mut().silent = silent;
    }

    /// Cut every reply short after `bits` data bits; `None` sends whole
    /// frames.
    pub fn set_stop_after(&self, bits: Option<u8>) {
        self.state.borrow_mut().stop_after_bits = bits;
    }

    /// Whether the host currently drives the line.
    pub fn host_driving(&self) -> bool {
        self.state.borrow().driving
    }

    /// The data line, for handing to the driver.
    pub fn line(&self) -> SimDht11Line {
        SimDht11Line {
            state: self.state.clone(),
        }
    }
}

/// Host side of the simulated sensor's data line.
#[derive(Debug)]
pub struct SimDht11Line {
    state: Rc<RefCell<State>>,
}

impl DualModeLine for SimDht11Line {
    fn set_as_output(&mut self) {
        let mut state = self.state.borrow_mut();
        state.driving = true;
        state.response_start = None;
    }

    fn set_as_input(&mut self) {
        let mut state = self.state.borrow_mut();
        state.driving = false;
        if state.armed && !state.silent {
            state.response_start = Some(state.timebase.now_ns());
        }
        state.armed = false;
    }

    fn set_high(&mut self) {
        let mut state = self.state.borrow_mut();
        if let Some(since) = state.low_since.take() {
            state.armed = state.timebase.now_ns() - since >= WAKE_MIN_NS;
        }
        state.host_level = true;
    }

    fn set_low(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.host_level {
            state.low_since = Some(state.timebase.now_ns());
        }
        state.host_level = false;
    }

    fn is_high(&mut self) -> bool {
        self.state.borrow().level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn test_short_wake_pulse_is_ignored() {
        let timebase = Timebase::new();
        let device = SimDht11::new(&timebase);
        let mut line = device.line();
        let mut delay = timebase.delay();

        line.set_as_output();
        line.set_low();
        delay.delay_ms(5);
        line.set_high();
        line.set_as_input();
        for _ in 0..300 {
            assert!(line.is_high());
            delay.delay_us(1);
        }
    }

    #[test]
    fn test_reply_waveform_starts_with_handshake() {
        let frame = [0xFF; 5];
        assert!(response_level(&frame, None, 0));
        assert!(!response_level(&frame, None, 20_000));
        assert!(response_level(&frame, None, 100_000));
        assert!(!response_level(&frame, None, 180_000));
        // First bit is a one: high from 230 to 300 µs
        assert!(response_level(&frame, None, 265_000));
        assert!(!response_level(&frame, None, 300_000));
    }

    #[test]
    fn test_truncated_reply_releases_line_after_last_bit() {
        let frame = [0x00; 5];
        // Handshake 180 µs, then one zero bit of 77 µs
        assert!(!response_level(&frame, Some(1), 200_000));
        assert!(response_level(&frame, Some(1), 240_000));
        // No second bit and no trailer
        assert!(response_level(&frame, Some(1), 270_000));
        assert!(response_level(&frame, Some(1), 1_000_000));
        assert!(!response_level(&frame, None, 270_000));
    }
}
