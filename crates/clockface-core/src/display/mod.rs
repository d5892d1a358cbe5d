//! Display composition and the panel sink
//!
//! The coordinator composes [`ScreenText`], renders it into a [`FrameBuffer`]
//! with `embedded-graphics`, and hands the whole frame to a [`DisplaySink`].

pub mod framebuffer;
pub mod layout;
pub mod panel;

pub use framebuffer::FrameBuffer;
pub use layout::{ClockView, ScreenText, compose, render};
pub use panel::{I2cPanelTransport, PagedPanel, PanelTransport};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display transport failed")]
    Transport,
    #[error("display used before initialization")]
    NotInitialized,
}

/// Accepts a complete frame.
pub trait DisplaySink {
    fn push_frame(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError>;
}

impl<T: DisplaySink + ?Sized> DisplaySink for &mut T {
    fn push_frame(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        (**self).push_frame(frame)
    }
}
