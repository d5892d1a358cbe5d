//! Startup configuration
//!
//! Pin numbers are plain GPIO numbers; the board layer turns them into pin
//! objects. Defaults match the reference wiring.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Every period and threshold the console runs on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub ui_tick_ms: u32,
    pub acquisition_period_ms: u32,
    pub blink_period_ms: u32,
    pub glitch_reject_ms: u32,
    pub debounce_ms: u32,
    /// Raw quadrature transitions per mechanical detent.
    pub steps_per_detent: i8,
    /// Events drained from the channel per tick.
    pub max_events_per_tick: u8,
}

impl Timing {
    pub const DEFAULT: Self = Self {
        ui_tick_ms: 50,
        acquisition_period_ms: 1000,
        blink_period_ms: 500,
        glitch_reject_ms: 1,
        debounce_ms: 30,
        steps_per_detent: 2,
        max_events_per_tick: 8,
    };

    pub const fn ui_tick(&self) -> Duration {
        Duration::from_millis(self.ui_tick_ms as u64)
    }

    pub const fn acquisition_period(&self) -> Duration {
        Duration::from_millis(self.acquisition_period_ms as u64)
    }

    pub const fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms as u64)
    }

    pub const fn glitch_reject(&self) -> Duration {
        Duration::from_millis(self.glitch_reject_ms as u64)
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms as u64)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPins {
    pub data: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPins {
    pub ce: u8,
    pub clk: u8,
    pub dat: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderPins {
    pub a: u8,
    pub b: u8,
    pub switch: u8,
}

/// Bus number and 7-bit address of the display controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBus {
    pub bus: u8,
    pub address: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct StartupConfig<'a> {
    pub sensor: SensorPins,
    pub clock: ClockPins,
    pub encoder: EncoderPins,
    pub display: DisplayBus,
    /// `YYYYMMDDhhmmss` applied once at startup when well-formed.
    pub initial_datetime: Option<&'a str>,
    pub timing: Timing,
}

impl Default for StartupConfig<'_> {
    fn default() -> Self {
        Self {
            sensor: SensorPins { data: 4 },
            clock: ClockPins {
                ce: 12,
                clk: 5,
                dat: 6,
            },
            encoder: EncoderPins {
                a: 23,
                b: 24,
                switch: 25,
            },
            display: DisplayBus {
                bus: 1,
                address: 0x3C,
            },
            initial_datetime: None,
            timing: Timing::DEFAULT,
        }
    }
}

/// Parse a bus address written as decimal or `0x`-prefixed hex.
pub fn parse_address(text: &str) -> Option<u8> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
    .filter(|address| *address < 0x80)
}
