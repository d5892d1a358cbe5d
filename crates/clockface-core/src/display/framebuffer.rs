//! Monochrome framebuffer in controller page layout.
//!
//! The panel controller addresses RAM in 8 horizontal pages of 8 pixel rows;
//! each byte is one column of a page with the least significant bit on top.
//! Keeping the buffer in that layout makes a page flush a plain slice copy.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
pub const PAGES: usize = HEIGHT / 8;

/// 128x64 framebuffer implementing `DrawTarget<Color = BinaryColor>`.
///
/// Tracks which pages changed since the last [`mark_clean`](Self::mark_clean).
#[derive(Clone)]
pub struct FrameBuffer {
    bytes: [u8; WIDTH * PAGES],
    dirty: u8,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// A blank buffer. Every page starts dirty so the first flush is full.
    pub const fn new() -> Self {
        Self {
            bytes: [0; WIDTH * PAGES],
            dirty: 0xFF,
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        let page = y / 8;
        let idx = page * WIDTH + x;
        let mask = 1u8 << (y % 8);
        let old = self.bytes[idx];
        let new = if on { old | mask } else { old & !mask };
        if new != old {
            self.bytes[idx] = new;
            self.dirty |= 1u8 << page;
        }
    }

    pub fn is_on(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.bytes[(y / 8) * WIDTH + x] & (1u8 << (y % 8)) != 0
    }

    /// The 128 column bytes of `page`.
    pub fn page(&self, page: usize) -> &[u8] {
        &self.bytes[page * WIDTH..(page + 1) * WIDTH]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    /// Pages changed since the last flush, top to bottom.
    pub fn dirty_pages(&self) -> impl Iterator<Item = usize> + '_ {
        (0..PAGES).filter(move |page| self.dirty & (1u8 << *page) != 0)
    }

    pub fn mark_clean(&mut self) {
        self.dirty = 0;
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (x, y) = (coord.x, coord.y);
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }
}
