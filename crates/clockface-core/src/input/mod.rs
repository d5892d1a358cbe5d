//! Rotary encoder and push-button input
//!
//! Edge interrupts feed the [`QuadratureDecoder`] and [`ButtonDebouncer`],
//! which publish discrete events into the single-slot [`EventChannel`].
//! Everything reachable from an interrupt handler is bounded, non-blocking
//! and free of logging.

pub mod button;
pub mod channel;
pub mod interrupts;
pub mod quadrature;

pub use button::ButtonDebouncer;
pub use channel::EventChannel;
pub use interrupts::{EncoderInput, RotaryEnable, RotaryIrqControl};
pub use quadrature::{QuadratureDecoder, decode_step};

/// A pending user event. At most one is ever buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEvent {
    #[default]
    None,
    RotateCw,
    RotateCcw,
    ButtonDown,
    ButtonUp,
}

/// Levels of encoder channels A and B packed as `(a << 1) | b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderRawState(u8);

impl EncoderRawState {
    pub const fn new(a: bool, b: bool) -> Self {
        Self(((a as u8) << 1) | b as u8)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b11)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Rotation direction of one detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Structured record handed to the blocking event reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventRecord {
    #[default]
    None,
    Rotation(Direction),
    Button,
}

impl EventRecord {
    /// Text form: `ROT +1`, `ROT -1`, `BTN` or `NONE`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Rotation(Direction::Clockwise) => "ROT +1",
            Self::Rotation(Direction::CounterClockwise) => "ROT -1",
            Self::Button => "BTN",
        }
    }

    /// The record a pushed event produces for the blocking reader, if any.
    pub const fn from_event(event: InputEvent) -> Option<Self> {
        match event {
            InputEvent::RotateCw => Some(Self::Rotation(Direction::Clockwise)),
            InputEvent::RotateCcw => Some(Self::Rotation(Direction::CounterClockwise)),
            InputEvent::ButtonDown => Some(Self::Button),
            InputEvent::None | InputEvent::ButtonUp => None,
        }
    }
}
