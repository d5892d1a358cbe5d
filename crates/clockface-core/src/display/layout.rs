//! Screen text composition and rendering
//!
//! ```text
//!  page 0  SET                T21C H35%
//!  page 2  2025-12-17
//!  page 4  12:30:45
//! ```

use core::fmt::Write;

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_layout::prelude::*;
use heapless::String;

use crate::clock_value::{ClockValue, EditField};
use crate::protocol::SensorReading;

const MODE_ORIGIN: Point = Point::new(0, 0);
const DATE_ORIGIN: Point = Point::new(0, 16);
const TIME_ORIGIN: Point = Point::new(0, 32);

const CLIMATE_PLACEHOLDER: &str = "T--C H--%";
const DATE_PLACEHOLDER: &str = "---- -- --";
const TIME_PLACEHOLDER: &str = "--:--:--";

/// What the date and time rows should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockView<'a> {
    /// Normal mode: the cached chip reading, or placeholders when invalid.
    Live(Option<&'a ClockValue>),
    /// Edit mode: the edit buffer, with `field` blanked while not `visible`.
    Editing {
        buffer: &'a ClockValue,
        field: EditField,
        visible: bool,
    },
}

/// Fixed-width text for every row of the screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScreenText {
    pub editing: bool,
    pub climate: String<12>,
    pub date: String<10>,
    pub time: String<8>,
}

/// Append `value` zero-padded to `width` digits, or `width` spaces.
fn push_field<const N: usize>(out: &mut String<N>, value: u16, width: usize, hidden: bool) {
    // Capacities match the fixed layouts, so these writes cannot overflow.
    if hidden {
        for _ in 0..width {
            let _ = out.push(' ');
        }
    } else {
        let _ = write!(out, "{:0width$}", value, width = width);
    }
}

fn push_separator<const N: usize>(out: &mut String<N>, separator: char) {
    let _ = out.push(separator);
}

/// Build the text of every row.
pub fn compose(climate: Option<SensorReading>, clock: ClockView<'_>) -> ScreenText {
    let mut text = ScreenText::default();

    match climate {
        Some(reading) => {
            let _ = write!(
                text.climate,
                "T{:02}C H{:02}%",
                reading.temperature, reading.humidity
            );
        }
        None => {
            let _ = text.climate.push_str(CLIMATE_PLACEHOLDER);
        }
    }

    let (value, hidden) = match clock {
        ClockView::Live(None) => {
            let _ = text.date.push_str(DATE_PLACEHOLDER);
            let _ = text.time.push_str(TIME_PLACEHOLDER);
            return text;
        }
        ClockView::Live(Some(value)) => (value, None),
        ClockView::Editing {
            buffer,
            field,
            visible,
        } => {
            text.editing = true;
            (buffer, (!visible).then_some(field))
        }
    };
    let hide = |field| hidden == Some(field);

    push_field(&mut text.date, value.full_year(), 4, hide(EditField::Year));
    push_separator(&mut text.date, '-');
    push_field(&mut text.date, value.month as u16, 2, hide(EditField::Month));
    push_separator(&mut text.date, '-');
    push_field(&mut text.date, value.day as u16, 2, hide(EditField::Day));

    push_field(&mut text.time, value.hour as u16, 2, hide(EditField::Hour));
    push_separator(&mut text.time, ':');
    push_field(&mut text.time, value.minute as u16, 2, hide(EditField::Minute));
    push_separator(&mut text.time, ':');
    push_field(&mut text.time, value.second as u16, 2, hide(EditField::Second));

    text
}

/// Draw `text` onto a cleared target. The climate row is right-aligned.
pub fn render<D>(text: &ScreenText, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let area = target.bounding_box();

    if text.editing {
        Text::with_baseline("SET", MODE_ORIGIN, style, Baseline::Top).draw(target)?;
    }

    Text::with_baseline(&text.climate, Point::zero(), style, Baseline::Top)
        .align_to(&area, horizontal::Right, vertical::Top)
        .draw(target)?;

    Text::with_baseline(&text.date, DATE_ORIGIN, style, Baseline::Top).draw(target)?;
    Text::with_baseline(&text.time, TIME_ORIGIN, style, Baseline::Top).draw(target)?;

    Ok(())
}
