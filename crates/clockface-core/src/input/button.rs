//! Asymmetric push-button debouncing
//!
//! Presses are debounced, releases are not: contact closure bounces, but a
//! stray extra release is rare and an instant release keeps the interaction
//! snappy.

use embassy_time::{Duration, Instant};

use super::InputEvent;

#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    latched: bool,
    last_press: Option<Instant>,
    window: Duration,
}

impl ButtonDebouncer {
    pub const fn new(window: Duration) -> Self {
        Self {
            latched: false,
            last_press: None,
            window,
        }
    }

    /// Whether the button is currently considered held.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Handle one edge; `pressed` is the debounced-side line level.
    pub fn on_edge(&mut self, pressed: bool, now: Instant) -> Option<InputEvent> {
        if !pressed {
            if !self.latched {
                return None;
            }
            self.latched = false;
            return Some(InputEvent::ButtonUp);
        }

        if let Some(last) = self.last_press {
            if now.saturating_duration_since(last) < self.window {
                return None;
            }
        }
        if self.latched {
            return None;
        }

        self.latched = true;
        self.last_press = Some(now);
        Some(InputEvent::ButtonDown)
    }
}
