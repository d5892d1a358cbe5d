//! Bidirectional GPIO line abstraction
//!
//! The sensor data wire and the clock chip's data wire are both driven by the
//! host for part of a transaction and released to the peripheral for the
//! rest, so a single line has to switch direction at runtime.

/// A GPIO line that can switch between driving and sensing.
///
/// Level changes made while the line is an input are latched and take effect
/// on the next [`set_as_output`](Self::set_as_output).
pub trait DualModeLine {
    /// Start driving the line.
    fn set_as_output(&mut self);

    /// Release the line so the peripheral can drive it.
    fn set_as_input(&mut self);

    fn set_high(&mut self);

    fn set_low(&mut self);

    /// Sample the current level.
    fn is_high(&mut self) -> bool;

    fn is_low(&mut self) -> bool {
        !self.is_high()
    }

    /// Drive the line to `high`.
    fn set_level(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

impl<T: DualModeLine + ?Sized> DualModeLine for &mut T {
    fn set_as_output(&mut self) {
        (**self).set_as_output();
    }

    fn set_as_input(&mut self) {
        (**self).set_as_input();
    }

    fn set_high(&mut self) {
        (**self).set_high();
    }

    fn set_low(&mut self) {
        (**self).set_low();
    }

    fn is_high(&mut self) -> bool {
        (**self).is_high()
    }
}
