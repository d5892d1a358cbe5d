//! Desktop simulator for the clockface sensor/clock console.
//!
//! Wires clockface-core to its pin-level simulated peripherals and drives the
//! coordinator on the real UI tick. The panel is drawn in the terminal, or in
//! an SDL2 window when built with the `window` feature.
//!
//! # Commands (stdin, one per line)
//!
//! | Input              | Action                                 |
//! |--------------------|----------------------------------------|
//! | `+` / `-`          | Turn the encoder one detent CW / CCW   |
//! | `p` or empty line  | Press and release the button           |
//! | `t`                | Read the sensor endpoint               |
//! | `c`                | Read the clock endpoint                |
//! | `c YYYYMMDDhhmmss` | Set the clock through the endpoint     |
//! | `e`                | Take the latest event record           |
//! | `q`                | Quit                                   |
//!
//! In the window, arrow keys turn the encoder, Space/Enter press the button,
//! T/C/E read the endpoints and Q/Esc quit.
//!
//! # Environment
//!
//! Variables may also come from a `.env` file in the working directory.
//!
//! | Variable                   | Meaning                                   |
//! |----------------------------|-------------------------------------------|
//! | `CLOCKFACE_INIT_DATETIME`  | `YYYYMMDDhhmmss` written once at startup  |
//! | `CLOCKFACE_DISPLAY_ADDR`   | Display address, decimal or `0x` hex      |
//! | `CLOCKFACE_UI_TICK_MS`     | UI tick period                            |
//! | `CLOCKFACE_ACQUISITION_MS` | Sensor/clock acquisition period           |
//! | `CLOCKFACE_READ_BACK`      | `1` to verify endpoint clock writes       |

use std::cell::Cell;
use std::collections::VecDeque;
use std::env;
use std::io::{self, BufRead};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant};
use log::{error, info, warn};

use clockface_core::config::{StartupConfig, Timing, parse_address};
use clockface_core::coordinator::Coordinator;
use clockface_core::display::PagedPanel;
use clockface_core::endpoints::{ClockEndpoint, EventEndpoint, SensorEndpoint};
use clockface_core::input::{Direction, EncoderInput, EncoderRawState, EventChannel};
use clockface_core::protocol::{Dht11Sensor, Ds1302Clock, SensorReading, SharedClock, SharedSensor};
use clockface_core::sim::{SimDht11, SimDs1302, SimPanel, Timebase};

#[cfg(not(feature = "window"))]
mod terminal;
#[cfg(not(feature = "window"))]
use terminal::Screen;

#[cfg(feature = "window")]
mod window;
#[cfg(feature = "window")]
use window::Screen;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A user request from stdin or the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Rotate(Direction),
    Press,
    Sensor,
    /// Read the clock, or set it from the given text.
    Clock(Option<String>),
    Events,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, argument) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, Some(rest.trim())),
        None => (line, None),
    };

    match word {
        "+" => Some(Command::Rotate(Direction::Clockwise)),
        "-" => Some(Command::Rotate(Direction::CounterClockwise)),
        "" | "p" => Some(Command::Press),
        "t" => Some(Command::Sensor),
        "c" => Some(Command::Clock(argument.map(str::to_owned))),
        "e" => Some(Command::Events),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

/// Forward stdin lines as commands until stdin closes or the receiver is
/// dropped.
fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => warn!("Unknown command {:?}", line.trim()),
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// Encoder and button
// ---------------------------------------------------------------------------

/// One physical action, applied to the input lines within a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Detent(Direction),
    Press,
    Release,
}

/// Clockwise Gray sequence of the (A, B) levels.
const GRAY: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

/// Turns gestures into timed pin edges for the interrupt-side input.
struct Knob {
    /// Index into [`GRAY`]; shared with the level sampler.
    position: Rc<Cell<usize>>,
    steps_per_detent: u8,
    spacing: Duration,
    last_edge: Instant,
}

impl Knob {
    fn new(timing: &Timing) -> Self {
        Self {
            position: Rc::new(Cell::new(0)),
            steps_per_detent: timing.steps_per_detent.max(1) as u8,
            // Consecutive edges must clear the glitch filter
            spacing: timing.glitch_reject() + Duration::from_millis(1),
            last_edge: Instant::from_ticks(0),
        }
    }

    /// Reads the current A/B levels, as board code would sample the pins.
    fn levels(&self) -> impl FnMut() -> EncoderRawState + use<> {
        let position = self.position.clone();
        move || {
            let (a, b) = GRAY[position.get()];
            EncoderRawState::new(a, b)
        }
    }

    fn apply(&mut self, gesture: Gesture, input: &EncoderInput<'_>) {
        match gesture {
            Gesture::Detent(direction) => {
                for _ in 0..self.steps_per_detent {
                    let position = self.position.get();
                    self.position.set(match direction {
                        Direction::Clockwise => (position + 1) % GRAY.len(),
                        Direction::CounterClockwise => (position + GRAY.len() - 1) % GRAY.len(),
                    });
                    self.rotary_edge(input);
                }
            }
            Gesture::Press => input.on_button_edge(true, self.next_edge()),
            Gesture::Release => input.on_button_edge(false, self.next_edge()),
        }
    }

    fn rotary_edge(&mut self, input: &EncoderInput<'_>) {
        let (a, b) = GRAY[self.position.get()];
        input.on_rotary_edge(a, b, self.next_edge());
    }

    fn next_edge(&mut self) -> Instant {
        let now = Instant::now().max(self.last_edge + self.spacing);
        self.last_edge = now;
        now
    }
}

// ---------------------------------------------------------------------------
// Synthetic climate
// ---------------------------------------------------------------------------

/// Slowly drifting reading, `t` in seconds since startup.
fn climate_at(t: f64) -> SensorReading {
    let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
    let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();
    SensorReading {
        temperature: temperature.round() as u8,
        humidity: humidity.round() as u8,
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env_millis(name: &str) -> Option<u32> {
    let text = env::var(name).ok()?;
    match text.trim().parse() {
        Ok(ms) if ms > 0 => Some(ms),
        _ => {
            warn!("Ignoring {}={:?}", name, text);
            None
        }
    }
}

fn load_config(initial_datetime: Option<&str>) -> StartupConfig<'_> {
    let mut config = StartupConfig {
        initial_datetime,
        ..StartupConfig::default()
    };

    if let Ok(text) = env::var("CLOCKFACE_DISPLAY_ADDR") {
        match parse_address(&text) {
            Some(address) => config.display.address = address,
            None => warn!("Ignoring CLOCKFACE_DISPLAY_ADDR={:?}", text),
        }
    }
    if let Some(ms) = env_millis("CLOCKFACE_UI_TICK_MS") {
        config.timing.ui_tick_ms = ms;
    }
    if let Some(ms) = env_millis("CLOCKFACE_ACQUISITION_MS") {
        config.timing.acquisition_period_ms = ms;
    }
    config
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let initial_datetime = env::var("CLOCKFACE_INIT_DATETIME").ok();
    let read_back = env::var("CLOCKFACE_READ_BACK")
        .is_ok_and(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"));
    let config = load_config(initial_datetime.as_deref());

    info!("Starting clockface simulator");
    info!(
        "Sensor GPIO{}, clock CE{}/CLK{}/DAT{}, encoder {}/{}/{}, display bus {} at {:#04x}",
        config.sensor.data,
        config.clock.ce,
        config.clock.clk,
        config.clock.dat,
        config.encoder.a,
        config.encoder.b,
        config.encoder.switch,
        config.display.bus,
        config.display.address
    );

    // Simulated peripherals share one virtual timebase for their waveforms
    let timebase = Timebase::new();
    let dht = SimDht11::new(&timebase);
    let chip = SimDs1302::new();
    let panel = SimPanel::new();

    let (ce, clk, dat) = chip.pins();
    let sensor_bus = Mutex::<CriticalSectionRawMutex, _>::new(Dht11Sensor::new(
        dht.line(),
        timebase.delay(),
    ));
    let clock_bus = Mutex::<CriticalSectionRawMutex, _>::new(Ds1302Clock::new(
        ce,
        clk,
        dat,
        timebase.delay(),
    ));

    let events = EventChannel::new();
    let input = EncoderInput::new(&events, &config.timing);

    let mut sink = PagedPanel::new(panel.clone());
    if let Err(e) = sink.init() {
        error!("Display init failed: {}", e);
        return;
    }

    let mut knob = Knob::new(&config.timing);
    let mut coordinator = Coordinator::new(
        SharedSensor::new(&sensor_bus),
        SharedClock::new(&clock_bus),
        &events,
        input.rotary_control(knob.levels()),
        sink,
        config.timing,
    );
    block_on(coordinator.start(config.initial_datetime));

    let mut clock_endpoint = ClockEndpoint::new(SharedClock::new(&clock_bus), read_back);
    let mut sensor_endpoint = SensorEndpoint::new(SharedSensor::new(&sensor_bus));
    let event_endpoint = EventEndpoint::new(&events);

    let stdin = spawn_stdin_reader();
    let mut screen = Screen::new();
    let mut gestures = VecDeque::new();

    let started = Instant::now();
    let mut next_second = started + Duration::from_secs(1);
    dht.set_reading(climate_at(0.0));

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        let tick_start = Instant::now();

        // --- Commands -----------------------------------------------------
        let mut commands: Vec<Command> = stdin.try_iter().collect();
        screen.poll(&mut commands);

        for command in commands {
            match command {
                Command::Quit => break 'running,
                Command::Rotate(direction) => gestures.push_back(Gesture::Detent(direction)),
                Command::Press => {
                    gestures.push_back(Gesture::Press);
                    gestures.push_back(Gesture::Release);
                }
                Command::Sensor => {
                    let text = block_on(sensor_endpoint.read());
                    screen.note(text.trim_end());
                }
                Command::Clock(None) => match block_on(clock_endpoint.read()) {
                    Ok(text) => screen.note(text.trim_end()),
                    Err(e) => screen.note(&format!("clock read failed: {}", e)),
                },
                Command::Clock(Some(text)) => {
                    match block_on(clock_endpoint.write(text.as_bytes())) {
                        Ok(_) => screen.note(&format!("clock set to {}", text)),
                        Err(e) => screen.note(&format!("clock write rejected: {}", e)),
                    }
                }
                Command::Events => screen.note(event_endpoint.try_read().trim_end()),
            }
        }

        // The event slot holds one event, so one gesture per tick
        if let Some(gesture) = gestures.pop_front() {
            knob.apply(gesture, &input);
        }

        // --- Simulated world ----------------------------------------------
        while tick_start >= next_second {
            chip.advance_seconds(1);
            next_second += Duration::from_secs(1);
            let elapsed = next_second.saturating_duration_since(started);
            dht.set_reading(climate_at(elapsed.as_millis() as f64 / 1000.0));
        }

        // --- Coordinator --------------------------------------------------
        block_on(coordinator.tick(tick_start));
        screen.show(&panel);

        // --- Tick pacing --------------------------------------------------
        let elapsed = tick_start.elapsed();
        let period = config.timing.ui_tick();
        if elapsed < period {
            thread::sleep(std::time::Duration::from_micros(
                (period - elapsed).as_micros(),
            ));
        }
    }

    coordinator.shutdown();
    screen.show(&panel);
    info!("Simulator exiting");
}
