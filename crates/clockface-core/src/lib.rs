//! Hardware-independent core library for the clockface console
//!
//! This crate contains all platform-agnostic logic for the console: the
//! bit-banged sensor and real-time clock protocols, the rotary encoder and
//! push-button input path, the time-editing interaction, display composition
//! and the periodic coordinator tying them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod clock_value;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod endpoints;
pub mod input;
pub mod interaction;
pub mod protocol;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use clock_value::{ClockField, ClockValue, EditField, ParseError};
pub use coordinator::{CachedReadings, Coordinator};
pub use input::{EventChannel, InputEvent};
pub use protocol::{ClockSource, HumiditySensor, ProtocolError, SensorReading};
