use alloc::rc::Rc;
use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::clock_value::ClockValue;
use crate::protocol::bcd::{self, FIELD_REGISTERS};
use crate::protocol::ds1302::{BURST_READ, WRITE_PROTECT_ON};
use crate::protocol::{DualModeLine, ProtocolError};

const CONTROL_REGISTER: usize = 7;
const BURST_WRITE: u8 = 0xBE;

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Command { value: u8, bits: u8 },
    Write { register: usize, value: u8, bits: u8 },
    Read { stream: [u8; 8], len: usize, pos: usize },
}

#[derive(Debug)]
struct State {
    fields: [u8; FIELD_REGISTERS],
    control: u8,
    ce: bool,
    clk: bool,
    host_drives: bool,
    host_level: bool,
    out_level: bool,
    phase: Phase,
    disconnected: bool,
}

impl State {
    fn register(&self, index: usize) -> u8 {
        if index == CONTROL_REGISTER {
            self.control
        } else {
            self.fields.get(index).copied().unwrap_or(0)
        }
    }

    fn burst(&self) -> [u8; 8] {
        let mut stream = [0u8; 8];
        stream[..FIELD_REGISTERS].copy_from_slice(&self.fields);
        stream[CONTROL_REGISTER] = self.control;
        stream
    }

    fn on_rising(&mut self) {
        if self.disconnected {
            return;
        }
        let bit = u8::from(self.host_drives && self.host_level);

        self.phase = match self.phase {
            Phase::Command { value, bits } => {
                let value = value | bit << bits;
                if bits + 1 < 8 {
                    Phase::Command {
                        value,
                        bits: bits + 1,
                    }
                } else {
                    self.decode_command(value)
                }
            }
            Phase::Write {
                register,
                value,
                bits,
            } => {
                let value = value | bit << bits;
                if bits + 1 < 8 {
                    Phase::Write {
                        register,
                        value,
                        bits: bits + 1,
                    }
                } else {
                    self.store(register, value);
                    Phase::Idle
                }
            }
            other => other,
        };
    }

    fn on_falling(&mut self) {
        if let Phase::Read { stream, len, pos } = &mut self.phase {
            self.out_level = *pos < *len * 8 && stream[*pos / 8] >> (*pos % 8) & 1 != 0;
            *pos += 1;
        }
    }

    fn decode_command(&self, command: u8) -> Phase {
        let register = ((command >> 1) & 0x1F) as usize;
        if command == BURST_READ {
            return Phase::Read {
                stream: self.burst(),
                len: 8,
                pos: 0,
            };
        }
        if command == BURST_WRITE || register > CONTROL_REGISTER {
            return Phase::Idle;
        }
        if command & 1 == 1 {
            let mut stream = [0u8; 8];
            stream[0] = self.register(register);
            Phase::Read {
                stream,
                len: 1,
                pos: 0,
            }
        } else {
            Phase::Write {
                register,
                value: 0,
                bits: 0,
            }
        }
    }

    fn store(&mut self, register: usize, value: u8) {
        if register == CONTROL_REGISTER {
            self.control = value;
        } else if self.control & WRITE_PROTECT_ON == 0 {
            self.fields[register] = value;
        }
    }
}

/// Simulated 3-wire clock chip.
///
/// Commands are shifted in on rising clock edges; read data is presented on
/// falling edges, starting with the falling edge that ends the command byte.
/// The chip powers up at 2000-01-01 00:00:00, write protected.
#[derive(Debug, Clone)]
pub struct SimDs1302 {
    state: Rc<RefCell<State>>,
}

impl Default for SimDs1302 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDs1302 {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                fields: bcd::encode_registers(&ClockValue::default()),
                control: WRITE_PROTECT_ON,
                ce: false,
                clk: false,
                host_drives: false,
                host_level: false,
                out_level: false,
                phase: Phase::Idle,
                disconnected: false,
            })),
        }
    }

    /// Chip-enable, clock and data lines, for handing to the driver.
    pub fn pins(&self) -> (SimDs1302Ce, SimDs1302Clk, SimDs1302Dat) {
        (
            SimDs1302Ce {
                state: self.state.clone(),
            },
            SimDs1302Clk {
                state: self.state.clone(),
            },
            SimDs1302Dat {
                state: self.state.clone(),
            },
        )
    }

    pub fn set_time(&self, value: &ClockValue) {
        self.set_registers(bcd::encode_registers(value));
    }

    /// Decode the current registers the way a burst read would.
    pub fn time(&self) -> Result<ClockValue, ProtocolError> {
        bcd::decode_registers(&self.state.borrow().burst())
    }

    pub fn registers(&self) -> [u8; FIELD_REGISTERS] {
        self.state.borrow().fields
    }

    /// Overwrite the timekeeping registers, ignoring write protection.
    pub fn set_registers(&self, fields: [u8; FIELD_REGISTERS]) {
        self.state.borrow_mut().fields = fields;
    }

    pub fn write_protected(&self) -> bool {
        self.state.borrow().control & WRITE_PROTECT_ON != 0
    }

    pub fn chip_enabled(&self) -> bool {
        self.state.borrow().ce
    }

    /// Let the oscillator run for `seconds`. Has no effect while the
    /// registers hold an invalid time.
    pub fn advance_seconds(&self, seconds: u32) {
        if let Ok(mut value) = self.time() {
            for _ in 0..seconds {
                value = value.next_second();
            }
            self.set_time(&value);
        }
    }

    /// Float the data line: every read returns all ones and writes are lost.
    pub fn disconnect(&self) {
        self.state.borrow_mut().disconnected = true;
    }

    pub fn reconnect(&self) {
        self.state.borrow_mut().disconnected = false;
    }
}

/// Chip-enable line of a [`SimDs1302`].
#[derive(Debug)]
pub struct SimDs1302Ce {
    state: Rc<RefCell<State>>,
}

impl ErrorType for SimDs1302Ce {
    type Error = Infallible;
}

impl OutputPin for SimDs1302Ce {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.ce = false;
        state.phase = Phase::Idle;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.ce {
            state.ce = true;
            state.phase = Phase::Command { value: 0, bits: 0 };
        }
        Ok(())
    }
}

/// Serial clock line of a [`SimDs1302`].
#[derive(Debug)]
pub struct SimDs1302Clk {
    state: Rc<RefCell<State>>,
}

impl ErrorType for SimDs1302Clk {
    type Error = Infallible;
}

impl OutputPin for SimDs1302Clk {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.clk && state.ce {
            state.on_falling();
        }
        state.clk = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if !state.clk && state.ce {
            state.on_rising();
        }
        state.clk = true;
        Ok(())
    }
}

/// Bidirectional data line of a [`SimDs1302`].
#[derive(Debug)]
pub struct SimDs1302Dat {
    state: Rc<RefCell<State>>,
}

impl DualModeLine for SimDs1302Dat {
    fn set_as_output(&mut self) {
        self.state.borrow_mut().host_drives = true;
    }

    fn set_as_input(&mut self) {
        self.state.borrow_mut().host_drives = false;
    }

    fn set_high(&mut self) {
        self.state.borrow_mut().host_level = true;
    }

    fn set_low(&mut self) {
        self.state.borrow_mut().host_level = false;
    }

    fn is_high(&mut self) -> bool {
        let state = self.state.borrow();
        if state.host_drives {
            state.host_level
        } else {
            state.disconnected || state.out_level
        }
    }
}
