//! Panel rendering in an SDL2 window via `embedded-graphics-simulator`.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use log::info;

use clockface_core::display::framebuffer::{HEIGHT, WIDTH};
use clockface_core::input::Direction;
use clockface_core::sim::SimPanel;

use crate::Command;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

fn keycode_to_command(keycode: Keycode) -> Option<Command> {
    match keycode {
        Keycode::Right | Keycode::Up => Some(Command::Rotate(Direction::Clockwise)),
        Keycode::Left | Keycode::Down => Some(Command::Rotate(Direction::CounterClockwise)),
        Keycode::Space | Keycode::Return => Some(Command::Press),
        Keycode::T => Some(Command::Sensor),
        Keycode::C => Some(Command::Clock(None)),
        Keycode::E => Some(Command::Events),
        Keycode::Q | Keycode::Escape => Some(Command::Quit),
        _ => None,
    }
}

pub struct Screen {
    display: SimulatorDisplay<BinaryColor>,
    window: Window,
    revision: Option<u64>,
}

impl Screen {
    pub fn new() -> Self {
        let display = SimulatorDisplay::new(Size::new(WIDTH as u32, HEIGHT as u32));
        let output_settings = OutputSettingsBuilder::new()
            .scale(WINDOW_SCALE)
            .theme(BinaryColorTheme::OledBlue)
            .build();
        let mut window = Window::new("Clockface Simulator", &output_settings);

        // The SDL window is created by the first `update()`, which must come
        // before `events()`
        window.update(&display);
        info!("Keys: arrows=turn  Space=press  T/C/E=endpoints  Q=quit");

        Self {
            display,
            window,
            revision: None,
        }
    }

    pub fn poll(&mut self, commands: &mut Vec<Command>) {
        for event in self.window.events() {
            match event {
                SimulatorEvent::Quit => commands.push(Command::Quit),
                SimulatorEvent::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => commands.extend(keycode_to_command(keycode)),
                _ => {}
            }
        }
    }

    pub fn note(&mut self, line: &str) {
        println!("{}", line);
    }

    pub fn show(&mut self, panel: &SimPanel) {
        if self.revision != Some(panel.revision()) {
            self.revision = Some(panel.revision());
            let pixels = (0..HEIGHT)
                .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
                .map(|(x, y)| {
                    let color = if panel.pixel(x, y) {
                        BinaryColor::On
                    } else {
                        BinaryColor::Off
                    };
                    Pixel(Point::new(x as i32, y as i32), color)
                });
            let Ok(()) = self.display.draw_iter(pixels);
        }
        self.window.update(&self.display);
    }
}
