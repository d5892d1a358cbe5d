//! Page-addressed OLED panel
//!
//! The controller is programmed once with a fixed init sequence and then
//! receives every page of the framebuffer as a page/column address command
//! followed by 128 data bytes.

use embedded_hal::i2c::I2c;
use log::{error, info};

use super::framebuffer::{FrameBuffer, PAGES};
use super::{DisplayError, DisplaySink};

/// Controller bring-up: display off, clock, 64 mux, no offset, start line
/// 0, charge pump on, horizontal addressing, segment and COM remap, COM
/// pins, contrast, precharge, VCOMH, resume from RAM, normal polarity,
/// display on.
pub const INIT_SEQUENCE: [u8; 25] = [
    0xAE, 0xD5, 0x80, 0xA8, 0x3F, 0xD3, 0x00, 0x40, 0x8D, 0x14, 0x20, 0x00, 0xA1, 0xC8, 0xDA,
    0x12, 0x81, 0xCF, 0xD9, 0xF1, 0xDB, 0x40, 0xA4, 0xA6, 0xAF,
];

pub const DISPLAY_OFF: u8 = 0xAE;
pub const PAGE_ADDRESS: u8 = 0xB0;
pub const COLUMN_LOW: u8 = 0x00;
pub const COLUMN_HIGH: u8 = 0x10;

/// Byte-level link to the controller.
pub trait PanelTransport {
    fn command(&mut self, bytes: &[u8]) -> Result<(), DisplayError>;
    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError>;
}

/// Display sink flushing whole frames page by page.
pub struct PagedPanel<T> {
    transport: T,
    initialized: bool,
}

impl<T: PanelTransport> PagedPanel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            initialized: false,
        }
    }

    /// Send the init sequence. Must succeed before frames are accepted.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.transport.command(&INIT_SEQUENCE).inspect_err(|e| {
            error!("Panel init failed: {}", e);
        })?;
        self.initialized = true;
        info!("Panel initialized");
        Ok(())
    }

    /// Switch the panel off. The panel must be initialized again afterwards.
    pub fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.initialized = false;
        self.transport.command(&[DISPLAY_OFF])
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn flush_page(&mut self, frame: &FrameBuffer, page: usize) -> Result<(), DisplayError> {
        self.transport
            .command(&[PAGE_ADDRESS | page as u8, COLUMN_LOW, COLUMN_HIGH])?;
        self.transport.data(frame.page(page))
    }
}

impl<T: PanelTransport> DisplaySink for PagedPanel<T> {
    fn push_frame(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        (0..PAGES).try_for_each(|page| self.flush_page(frame, page))
    }
}

/// I2C control byte announcing command bytes.
pub const CONTROL_COMMAND: u8 = 0x00;
/// I2C control byte announcing display RAM data.
pub const CONTROL_DATA: u8 = 0x40;
/// Payload bytes per I2C write.
pub const CHUNK: usize = 16;

/// Panel transport over an `embedded-hal` I2C bus.
pub struct I2cPanelTransport<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> I2cPanelTransport<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    fn send(&mut self, control: u8, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut buf = [0u8; CHUNK + 1];
        buf[0] = control;
        for chunk in bytes.chunks(CHUNK) {
            buf[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c
                .write(self.address, &buf[..=chunk.len()])
                .map_err(|_| DisplayError::Transport)?;
        }
        Ok(())
    }
}

impl<I: I2c> PanelTransport for I2cPanelTransport<I> {
    fn command(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.send(CONTROL_COMMAND, bytes)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.send(CONTROL_DATA, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPanel;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    #[test]
    fn test_frame_rejected_before_init() {
        let mut panel = PagedPanel::new(SimPanel::new());
        assert_eq!(
            panel.push_frame(&FrameBuffer::new()),
            Err(DisplayError::NotInitialized)
        );
    }

    #[test]
    fn test_flush_lands_in_panel_ram() {
        let sim = SimPanel::new();
        let mut panel = PagedPanel::new(sim.clone());
        panel.init().unwrap();
        assert!(sim.is_on());

        let mut fb = FrameBuffer::new();
        Pixel(Point::new(100, 45), BinaryColor::On).draw(&mut fb).unwrap();
        panel.push_frame(&fb).unwrap();
        assert!(sim.pixel(100, 45));
        assert!(!sim.pixel(100, 44));
        assert_eq!(sim.frames(), 1);

        panel.shutdown().unwrap();
        assert!(!sim.is_on());
        assert!(!panel.is_initialized());
    }

    #[test]
    fn test_transport_failure_is_reported() {
        let sim = SimPanel::new();
        let mut panel = PagedPanel::new(sim.clone());
        sim.set_failing(true);
        assert_eq!(panel.init(), Err(DisplayError::Transport));
        assert!(!panel.is_initialized());
    }

    /// Records every I2C write.
    #[derive(Default)]
    struct RecordingI2c {
        writes: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
    }

    impl ErrorType for RecordingI2c {
        type Error = ErrorKind;
    }

    impl I2c for RecordingI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_i2c_transport_chunks_with_control_byte() {
        let mut transport = I2cPanelTransport::new(RecordingI2c::default(), 0x3C);
        transport.data(&[0xAA; 40]).unwrap();
        transport.command(&[PAGE_ADDRESS | 3, COLUMN_LOW, COLUMN_HIGH]).unwrap();

        let writes = &transport.i2c.writes;
        assert_eq!(writes.len(), 4);
        assert!(writes.iter().all(|(address, _)| *address == 0x3C));
        assert_eq!(writes[0].1.len(), 17);
        assert_eq!(writes[0].1[0], CONTROL_DATA);
        assert_eq!(writes[2].1.len(), 9);
        assert_eq!(writes[3].1, [CONTROL_COMMAND, 0xB3, 0x00, 0x10]);
    }
}
