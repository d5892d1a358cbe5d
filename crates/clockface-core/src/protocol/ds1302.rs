//! 3-wire real-time clock chip
//!
//! Every transaction runs with chip-enable asserted: the host shifts out a
//! command byte LSB first on rising clock edges, then either shifts out a data
//! byte or releases the data line and shifts in the chip's reply. Odd command
//! bytes read, even ones write.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info};

use crate::clock_value::ClockValue;

use super::bcd::{self, FIELD_REGISTERS};
use super::{ClockSource, DualModeLine, ProtocolError};

/// Read all timekeeping registers plus the control register in one session.
pub const BURST_READ: u8 = 0xBF;
/// Write command of the seconds register; later fields follow at +2.
pub const SECONDS_WRITE: u8 = 0x80;
/// Write command of the control (write-protect) register.
pub const CONTROL_WRITE: u8 = 0x8E;

pub const WRITE_PROTECT_OFF: u8 = 0x00;
pub const WRITE_PROTECT_ON: u8 = 0x80;

const SESSION_SETTLE_US: u32 = 4;
const HALF_BIT_US: u32 = 1;

/// Clock chip driver owning its three lines.
pub struct Ds1302Clock<CE, CLK, DAT, D> {
    ce: CE,
    clk: CLK,
    dat: DAT,
    delay: D,
}

fn pin<E>(result: Result<(), E>) -> Result<(), ProtocolError> {
    result.map_err(|_| ProtocolError::Transport)
}

impl<CE, CLK, DAT, D> Ds1302Clock<CE, CLK, DAT, D>
where
    CE: OutputPin,
    CLK: OutputPin,
    DAT: DualModeLine,
    D: DelayNs,
{
    pub fn new(ce: CE, clk: CLK, dat: DAT, delay: D) -> Self {
        Self { ce, clk, dat, delay }
    }

    fn begin(&mut self) -> Result<(), ProtocolError> {
        pin(self.clk.set_low())?;
        pin(self.ce.set_high())?;
        self.delay.delay_us(SESSION_SETTLE_US);
        Ok(())
    }

    fn end(&mut self) -> Result<(), ProtocolError> {
        pin(self.ce.set_low())?;
        self.delay.delay_us(SESSION_SETTLE_US);
        Ok(())
    }

    /// Run `body` inside one chip-enable session. Chip-enable is released
    /// on every path, including a failed `begin`.
    fn session<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        let result = self.begin().and_then(|()| body(self));
        let released = self.end();
        let value = result?;
        released?;
        Ok(value)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.dat.set_as_output();
        for bit in 0..8 {
            self.dat.set_level((byte >> bit) & 1 != 0);
            self.delay.delay_us(HALF_BIT_US);
            pin(self.clk.set_high())?;
            self.delay.delay_us(HALF_BIT_US);
            pin(self.clk.set_low())?;
            self.delay.delay_us(HALF_BIT_US);
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        self.dat.set_as_input();
        let mut byte = 0;
        for bit in 0..8 {
            pin(self.clk.set_high())?;
            self.delay.delay_us(HALF_BIT_US);
            if self.dat.is_high() {
                byte |= 1 << bit;
            }
            pin(self.clk.set_low())?;
            self.delay.delay_us(HALF_BIT_US);
        }
        Ok(byte)
    }

    /// Write one register in its own session.
    pub fn write_register(&mut self, command: u8, data: u8) -> Result<(), ProtocolError> {
        self.session(|chip| {
            chip.write_byte(command)?;
            chip.write_byte(data)
        })
    }

    /// Read one register in its own session.
    pub fn read_register(&mut self, command: u8) -> Result<u8, ProtocolError> {
        self.session(|chip| {
            chip.write_byte(command | 1)?;
            chip.read_byte()
        })
    }

    /// Raw burst read of the seven timekeeping registers and the control
    /// register.
    pub fn read_burst(&mut self) -> Result<[u8; 8], ProtocolError> {
        self.session(|chip| {
            chip.write_byte(BURST_READ)?;
            let mut raw = [0u8; 8];
            for byte in raw.iter_mut() {
                *byte = chip.read_byte()?;
            }
            Ok(raw)
        })
    }

    fn write_fields(&mut self, value: &ClockValue) -> Result<(), ProtocolError> {
        value
            .check()
            .map_err(|field| ProtocolError::Range { field })?;
        let fields = bcd::encode_registers(value);

        self.write_register(CONTROL_WRITE, WRITE_PROTECT_OFF)?;
        let written = fields
            .iter()
            .zip((0..FIELD_REGISTERS as u8).map(|i| SECONDS_WRITE + 2 * i))
            .try_for_each(|(&data, command)| self.write_register(command, data));
        // Re-protect even when a field write failed
        let protected = self.write_register(CONTROL_WRITE, WRITE_PROTECT_ON);
        written?;
        protected
    }
}

impl<CE, CLK, DAT, D> ClockSource for Ds1302Clock<CE, CLK, DAT, D>
where
    CE: OutputPin,
    CLK: OutputPin,
    DAT: DualModeLine,
    D: DelayNs,
{
    async fn read_clock(&mut self) -> Result<ClockValue, ProtocolError> {
        let raw = self.read_burst()?;
        let value = bcd::decode_registers(&raw)?;
        debug!("DS1302: read {}", value);
        Ok(value)
    }

    async fn write_clock(&mut self, value: ClockValue) -> Result<(), ProtocolError> {
        self.write_fields(&value)?;
        info!("DS1302: set to {}", value);
        Ok(())
    }
}
