//! Interrupt-side glue for the encoder and button lines
//!
//! [`EncoderInput`] owns the decoder and debouncer state behind
//! `critical_section` cells so the edge handlers can share it with the task
//! that enables and disables rotation. Board code calls
//! [`on_rotary_edge`](EncoderInput::on_rotary_edge) from the A/B edge
//! interrupts and [`on_button_edge`](EncoderInput::on_button_edge) from the
//! switch interrupt, passing freshly sampled levels and the current instant.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::Instant;

use crate::config::Timing;

use super::{ButtonDebouncer, EncoderRawState, EventChannel, QuadratureDecoder};

/// Global enable switch for the rotary interrupt source.
pub trait RotaryIrqControl {
    fn set_rotary_enabled(&mut self, enabled: bool);
}

impl<T: RotaryIrqControl + ?Sized> RotaryIrqControl for &mut T {
    fn set_rotary_enabled(&mut self, enabled: bool) {
        (**self).set_rotary_enabled(enabled);
    }
}

struct RotaryState {
    decoder: QuadratureDecoder,
    enabled: bool,
}

pub struct EncoderInput<'a> {
    channel: &'a EventChannel,
    rotary: Mutex<RefCell<RotaryState>>,
    button: Mutex<RefCell<ButtonDebouncer>>,
}

impl<'a> EncoderInput<'a> {
    /// Rotation starts disabled.
    pub const fn new(channel: &'a EventChannel, timing: &Timing) -> Self {
        Self {
            channel,
            rotary: Mutex::new(RefCell::new(RotaryState {
                decoder: QuadratureDecoder::new(
                    EncoderRawState::from_bits(0),
                    timing.glitch_reject(),
                    timing.steps_per_detent,
                ),
                enabled: false,
            })),
            button: Mutex::new(RefCell::new(ButtonDebouncer::new(timing.debounce()))),
        }
    }

    pub fn channel(&self) -> &'a EventChannel {
        self.channel
    }

    pub fn rotary_enabled(&self) -> bool {
        critical_section::with(|cs| self.rotary.borrow_ref(cs).enabled)
    }

    /// Edge on either encoder channel. Ignored while rotation is disabled.
    pub fn on_rotary_edge(&self, a: bool, b: bool, now: Instant) {
        let state = EncoderRawState::new(a, b);
        let event = critical_section::with(|cs| {
            let mut rotary = self.rotary.borrow_ref_mut(cs);
            if !rotary.enabled {
                return None;
            }
            rotary.decoder.on_edge(state, now)
        });

        if let Some(event) = event {
            self.channel.push(event);
        }
    }

    /// Edge on the switch line; `pressed` is true while the button is down.
    pub fn on_button_edge(&self, pressed: bool, now: Instant) {
        let event =
            critical_section::with(|cs| self.button.borrow_ref_mut(cs).on_edge(pressed, now));
        if let Some(event) = event {
            self.channel.push(event);
        }
    }

    /// Enable or disable the rotary source. Partial rotations are dropped on
    /// both transitions and the decoder restarts from `resting`, the levels
    /// sampled from the A/B lines at this moment.
    pub fn set_rotary_enabled(&self, enabled: bool, resting: EncoderRawState) {
        critical_section::with(|cs| {
            let mut rotary = self.rotary.borrow_ref_mut(cs);
            rotary.enabled = enabled;
            rotary.decoder.reset(resting);
        });
    }

    /// Enable handle for the interaction machine. `sample` reads the current
    /// A/B levels whenever rotation is switched.
    pub fn rotary_control<F>(&self, sample: F) -> RotaryEnable<'_, 'a, F>
    where
        F: FnMut() -> EncoderRawState,
    {
        RotaryEnable {
            input: self,
            sample,
        }
    }
}

/// [`RotaryIrqControl`] over an [`EncoderInput`] and a level sampler.
pub struct RotaryEnable<'r, 'a, F> {
    input: &'r EncoderInput<'a>,
    sample: F,
}

impl<F> RotaryIrqControl for RotaryEnable<'_, '_, F>
where
    F: FnMut() -> EncoderRawState,
{
    fn set_rotary_enabled(&mut self, enabled: bool) {
        let resting = (self.sample)();
        self.input.set_rotary_enabled(enabled, resting);
    }
}
