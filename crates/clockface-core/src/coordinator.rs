//! Periodic coordinator tying input, acquisition and display together
//!
//! Every UI tick, in order:
//! 1. drain a bounded number of events into the interaction machine,
//! 2. re-read sensor and clock when the acquisition period has elapsed
//!    (the clock only in normal mode, so an edit is never overwritten),
//! 3. advance the blink phase,
//! 4. compose and render the screen,
//! 5. push the frame to the display sink.
//!
//! The coordinator owns every piece of formerly global state: the cached
//! readings, the interaction machine and the framebuffer. Time is passed in
//! explicitly so a tick is fully deterministic under test.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Ticker};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::{debug, error, info, warn};

use crate::clock_value::ClockValue;
use crate::config::Timing;
use crate::display::{DisplaySink, FrameBuffer, compose, render};
use crate::input::{EventChannel, InputEvent, RotaryIrqControl};
use crate::interaction::{InteractionStateMachine, Mode, Transition};
use crate::protocol::{ClockSource, HumiditySensor, SensorReading};

/// Last acquisition results; `None` marks a failed or missing reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedReadings {
    pub climate: Option<SensorReading>,
    pub clock: Option<ClockValue>,
}

pub struct Coordinator<'a, S, C, R, D> {
    sensor: S,
    clock: C,
    events: &'a EventChannel,
    interaction: InteractionStateMachine<R>,
    display: D,
    frame: FrameBuffer,
    cached: CachedReadings,
    timing: Timing,
    last_acquisition: Option<Instant>,
}

impl<'a, S, C, R, D> Coordinator<'a, S, C, R, D>
where
    S: HumiditySensor,
    C: ClockSource,
    R: RotaryIrqControl,
    D: DisplaySink,
{
    pub fn new(
        sensor: S,
        clock: C,
        events: &'a EventChannel,
        rotary: R,
        display: D,
        timing: Timing,
    ) -> Self {
        Self {
            sensor,
            clock,
            events,
            interaction: InteractionStateMachine::new(rotary, timing.blink_period()),
            display,
            frame: FrameBuffer::new(),
            cached: CachedReadings::default(),
            timing,
            last_acquisition: None,
        }
    }

    /// Apply the optional initial clock string and show a blank frame.
    ///
    /// A malformed string or a failed write is logged and otherwise ignored.
    pub async fn start(&mut self, initial_datetime: Option<&str>) {
        if let Some(text) = initial_datetime {
            match ClockValue::parse_compact(text.as_bytes()) {
                Ok(value) => match self.clock.write_clock(value).await {
                    Ok(()) => info!("Initial clock applied: {}", value),
                    Err(e) => warn!("Initial clock write failed: {}", e),
                },
                Err(e) => warn!("Ignoring initial clock {:?}: {}", text, e),
            }
        }

        self.blank();
        info!("Coordinator started");
    }

    /// Run one tick at `now`.
    pub async fn tick(&mut self, now: Instant) {
        self.drain_events(now).await;

        let due = self.last_acquisition.is_none_or(|last| {
            now.saturating_duration_since(last) >= self.timing.acquisition_period()
        });
        if due {
            self.acquire(now).await;
        }

        self.interaction.update_blink(now);

        let text = compose(
            self.cached.climate,
            self.interaction.view(self.cached.clock.as_ref()),
        );
        let Ok(()) = render(&text, &mut self.frame);
        self.push_frame();
    }

    /// Tick on the configured period until `stop` is signalled. The tick in
    /// flight always completes; a blank frame is pushed on the way out.
    pub async fn run(&mut self, stop: &Signal<CriticalSectionRawMutex, ()>) {
        let mut ticker = Ticker::every(self.timing.ui_tick());
        loop {
            self.tick(Instant::now()).await;
            if let Either::Second(()) = select(ticker.next(), stop.wait()).await {
                break;
            }
        }
        self.shutdown();
    }

    /// Discard any edit, switch rotation off and blank the display.
    pub fn shutdown(&mut self) {
        self.interaction.abandon();
        self.blank();
        info!("Coordinator stopped");
    }

    async fn drain_events(&mut self, now: Instant) {
        for _ in 0..self.timing.max_events_per_tick {
            let event = self.events.pop();
            if event == InputEvent::None {
                break;
            }

            let transition = self.interaction.handle(event, &mut self.clock, now).await;
            debug!("{:?} -> {:?}", event, transition);
            if let Transition::Committed(value) = transition {
                self.cached.clock = Some(value);
            }
        }
    }

    async fn acquire(&mut self, now: Instant) {
        self.last_acquisition = Some(now);

        self.cached.climate = match self.sensor.read_sensor().await {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Sensor acquisition failed: {}", e);
                None
            }
        };

        if self.interaction.mode() == Mode::Normal {
            self.cached.clock = match self.clock.read_clock().await {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Clock acquisition failed: {}", e);
                    None
                }
            };
        }
    }

    fn blank(&mut self) {
        let Ok(()) = self.frame.clear(BinaryColor::Off);
        self.push_frame();
    }

    fn push_frame(&mut self) {
        match self.display.push_frame(&self.frame) {
            Ok(()) => self.frame.mark_clean(),
            Err(e) => error!(
                "Display push failed with {} page(s) pending: {}",
                self.frame.dirty_pages().count(),
                e
            ),
        }
    }

    pub fn cached(&self) -> &CachedReadings {
        &self.cached
    }

    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }

    pub fn interaction(&self) -> &InteractionStateMachine<R> {
        &self.interaction
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}
