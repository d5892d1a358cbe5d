use alloc::rc::Rc;
use core::cell::RefCell;

use crate::display::DisplayError;
use crate::display::framebuffer::{HEIGHT, PAGES, WIDTH};
use crate::display::panel::{COLUMN_HIGH, COLUMN_LOW, PAGE_ADDRESS, PanelTransport};

/// Commands followed by one argument byte.
const ONE_ARGUMENT: [u8; 9] = [0xD5, 0xA8, 0xD3, 0x8D, 0x20, 0xDA, 0x81, 0xD9, 0xDB];

#[derive(Debug)]
struct State {
    ram: [u8; WIDTH * PAGES],
    page: usize,
    column: usize,
    on: bool,
    failing: bool,
    frames: usize,
    revision: u64,
}

impl State {
    fn apply_commands(&mut self, bytes: &[u8]) {
        let mut bytes = bytes.iter().copied();
        while let Some(command) = bytes.next() {
            match command {
                0xAE => self.on = false,
                0xAF => self.on = true,
                c if c & 0xF8 == PAGE_ADDRESS => self.page = (c & 0x07) as usize,
                c if c & 0xF0 == COLUMN_LOW => {
                    self.column = (self.column & 0xF0) | (c & 0x0F) as usize;
                }
                c if c & 0xF0 == COLUMN_HIGH => {
                    self.column = (self.column & 0x0F) | (((c & 0x07) as usize) << 4);
                }
                c if ONE_ARGUMENT.contains(&c) => {
                    bytes.next();
                }
                _ => {}
            }
        }
    }

    fn write_data(&mut self, bytes: &[u8]) {
        let mut changed = false;
        for &byte in bytes {
            let cell = &mut self.ram[self.page * WIDTH + self.column];
            changed |= *cell != byte;
            *cell = byte;
            // Page addressing wraps within the page
            self.column = (self.column + 1) % WIDTH;
            if self.column == 0 && self.page == PAGES - 1 {
                self.frames += 1;
            }
        }
        if changed {
            self.revision += 1;
        }
    }
}

/// Simulated page-addressed OLED controller.
///
/// Clones share the same panel, so one clone can be handed to the sink
/// while another is kept for inspection.
#[derive(Debug, Clone)]
pub struct SimPanel {
    state: Rc<RefCell<State>>,
}

impl Default for SimPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPanel {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                ram: [0; WIDTH * PAGES],
                page: 0,
                column: 0,
                on: false,
                failing: false,
                frames: 0,
                revision: 0,
            })),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH
            && y < HEIGHT
            && self.state.borrow().ram[(y / 8) * WIDTH + x] & (1u8 << (y % 8)) != 0
    }

    pub fn is_on(&self) -> bool {
        self.state.borrow().on
    }

    /// Number of times the last page was written to its end.
    pub fn frames(&self) -> usize {
        self.state.borrow().frames
    }

    /// Increments whenever panel RAM content changes.
    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    /// Make every transfer fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    /// Whether no pixel is lit.
    pub fn is_blank(&self) -> bool {
        self.state.borrow().ram.iter().all(|b| *b == 0)
    }
}

impl PanelTransport for SimPanel {
    fn command(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(DisplayError::Transport);
        }
        state.apply_commands(bytes);
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(DisplayError::Transport);
        }
        state.write_data(bytes);
        Ok(())
    }
}
