//! Panel rendering with half-block characters on an ANSI terminal.

use std::io::{self, Write};

use clockface_core::display::framebuffer::{HEIGHT, WIDTH};
use clockface_core::sim::SimPanel;

use crate::Command;

pub struct Screen {
    revision: Option<u64>,
    status: String,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            revision: None,
            status: String::from("+/- turn, p press, t/c/e endpoints, q quit"),
        }
    }

    /// Keys arrive through stdin lines only.
    pub fn poll(&mut self, _commands: &mut Vec<Command>) {}

    /// Show one line of endpoint output under the panel.
    pub fn note(&mut self, line: &str) {
        self.status = line.to_owned();
        self.revision = None;
    }

    /// Redraw when the panel RAM changed since the last call.
    pub fn show(&mut self, panel: &SimPanel) {
        if self.revision == Some(panel.revision()) {
            return;
        }
        self.revision = Some(panel.revision());

        let border: String = core::iter::repeat_n('-', WIDTH).collect();
        let mut out = String::with_capacity((WIDTH + 4) * (HEIGHT / 2 + 4) * 3);
        out.push_str("\x1b[H\x1b[2J");
        out.push('+');
        out.push_str(&border);
        out.push_str("+\n");

        // Two pixel rows per text row
        for row in 0..HEIGHT / 2 {
            out.push('|');
            for x in 0..WIDTH {
                let upper = panel.pixel(x, 2 * row);
                let lower = panel.pixel(x, 2 * row + 1);
                out.push(match (upper, lower) {
                    (false, false) => ' ',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (true, true) => '█',
                });
            }
            out.push_str("|\n");
        }

        out.push('+');
        out.push_str(&border);
        out.push_str("+\n");
        out.push_str(if panel.is_on() { "[on] " } else { "[off] " });
        out.push_str(&self.status);
        out.push('\n');

        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(out.as_bytes());
        let _ = stdout.flush();
    }
}
