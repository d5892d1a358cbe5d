//! Pin-level simulated peripherals
//!
//! These models stand in for the real sensor, clock chip and display panel on
//! the desktop and in tests. They react to the same line toggles the drivers
//! produce, against a virtual microsecond timebase that only moves when a
//! driver delays.

mod dht11;
mod ds1302;
mod panel;
mod timebase;

pub use dht11::{SimDht11, SimDht11Line};
pub use ds1302::{SimDs1302, SimDs1302Ce, SimDs1302Clk, SimDs1302Dat};
pub use panel::SimPanel;
pub use timebase::{SimDelay, Timebase};
