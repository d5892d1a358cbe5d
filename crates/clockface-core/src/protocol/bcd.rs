//! Register encoding for the clock chip
//!
//! Fields are stored as packed BCD. The hour register doubles as a mode
//! register: bit 7 selects 12-hour mode, in which bit 5 is the PM flag.

use crate::clock_value::{ClockField, ClockValue};

use super::ProtocolError;

/// Number of timekeeping registers (seconds through year).
pub const FIELD_REGISTERS: usize = 7;

const SECONDS_MASK: u8 = 0x7F;
const MINUTES_MASK: u8 = 0x7F;
const HOUR_24_MASK: u8 = 0x3F;
const HOUR_12_MASK: u8 = 0x1F;
const DAY_MASK: u8 = 0x3F;
const MONTH_MASK: u8 = 0x1F;
const WEEKDAY_MASK: u8 = 0x07;

const HOUR_12_MODE: u8 = 0x80;
const HOUR_PM: u8 = 0x20;

pub const fn bcd_to_bin(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

pub const fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decode the hour register into 0..=23, reconstructing 12-hour encodings.
pub fn decode_hour(raw: u8) -> Result<u8, ProtocolError> {
    let range = ProtocolError::Range {
        field: ClockField::Hour,
    };

    if raw & HOUR_12_MODE == 0 {
        let hour = bcd_to_bin(raw & HOUR_24_MASK);
        return if hour > 23 { Err(range) } else { Ok(hour) };
    }

    let hour = bcd_to_bin(raw & HOUR_12_MASK);
    if hour == 0 || hour > 12 {
        return Err(range);
    }

    Ok(match (raw & HOUR_PM != 0, hour) {
        (false, 12) => 0,
        (false, h) => h,
        (true, 12) => 12,
        (true, h) => h + 12,
    })
}

/// Decode a burst read. The eighth (control) byte is ignored.
pub fn decode_registers(raw: &[u8; 8]) -> Result<ClockValue, ProtocolError> {
    let second = bcd_to_bin(raw[0] & SECONDS_MASK);
    if second > 59 {
        return Err(ProtocolError::Range {
            field: ClockField::Second,
        });
    }
    let minute = bcd_to_bin(raw[1] & MINUTES_MASK);
    if minute > 59 {
        return Err(ProtocolError::Range {
            field: ClockField::Minute,
        });
    }

    let value = ClockValue {
        second,
        minute,
        hour: decode_hour(raw[2])?,
        day: bcd_to_bin(raw[3] & DAY_MASK),
        month: bcd_to_bin(raw[4] & MONTH_MASK),
        weekday: raw[5] & WEEKDAY_MASK,
        year: bcd_to_bin(raw[6]),
    };
    value
        .check()
        .map_err(|field| ProtocolError::Range { field })?;

    Ok(value)
}

/// Encode the timekeeping registers in 24-hour mode with the clock-halt bit
/// cleared. A weekday of 0 is stored as 1.
pub fn encode_registers(value: &ClockValue) -> [u8; FIELD_REGISTERS] {
    let weekday = if value.weekday == 0 { 1 } else { value.weekday };
    [
        bin_to_bcd(value.second) & SECONDS_MASK,
        bin_to_bcd(value.minute) & MINUTES_MASK,
        bin_to_bcd(value.hour) & HOUR_24_MASK,
        bin_to_bcd(value.day) & DAY_MASK,
        bin_to_bcd(value.month) & MONTH_MASK,
        weekday & WEEKDAY_MASK,
        bin_to_bcd(value.year),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(fields: [u8; FIELD_REGISTERS]) -> [u8; 8] {
        let mut raw = [0x80; 8];
        raw[..FIELD_REGISTERS].copy_from_slice(&fields);
        raw
    }

    #[test]
    fn test_bcd_round_trip_over_field_ranges() {
        for (field, max) in [("second", 59), ("hour", 23), ("day", 31), ("year", 99)] {
            for v in 0..=max {
                assert_eq!(bcd_to_bin(bin_to_bcd(v)), v, "{field} {v}");
            }
        }
        assert_eq!(bin_to_bcd(59), 0x59);
        assert_eq!(bcd_to_bin(0x23), 23);
    }

    #[test]
    fn test_twelve_hour_reconstruction() {
        // 12 AM
        assert_eq!(decode_hour(0x80 | 0x12), Ok(0));
        // 9 AM
        assert_eq!(decode_hour(0x80 | 0x09), Ok(9));
        // 12 PM
        assert_eq!(decode_hour(0x80 | HOUR_PM | 0x12), Ok(12));
        // 11 PM
        assert_eq!(decode_hour(0x80 | HOUR_PM | 0x11), Ok(23));
        assert!(decode_hour(0x80 | 0x13).is_err());
        assert!(decode_hour(0x80).is_err());
        assert_eq!(decode_hour(0x23), Ok(23));
        assert!(decode_hour(0x24).is_err());
    }

    #[test]
    fn test_decode_masks_clock_halt_and_validates() {
        let value =
        decode_registers(&burst([0x80 | 0x30, 0x45, 0x17, 0x29, 0x02, 0x04, 0x24])).unwrap();
        assert_eq!((value.hour, value.minute, value.second), (17, 45, 30));
        assert_eq!((value.full_year(), value.month, value.day), (2024, 2, 29));
        assert_eq!(value.weekday, 4);

        assert_eq!(
            decode_registers(&burst([0x00, 0x60, 0x00, 0x01, 0x01, 0x01, 0x00])),
            Err(ProtocolError::Range {
                field: ClockField::Minute
            })
        );
        assert_eq!(
            decode_registers(&[0xFF; 8]),
            Err(ProtocolError::Range {
                field: ClockField::Second
            })
        );
    }

    #[test]
    fn test_encode_matches_decode() {
        let mut value = ClockValue::from_calendar(2031, 11, 30, 8, 5, 9).unwrap();
        value.weekday = 0;
        let fields = encode_registers(&value);
        assert_eq!(fields, [0x09, 0x05, 0x08, 0x30, 0x11, 0x01, 0x31]);

        let decoded = decode_registers(&burst(fields)).unwrap();
        assert_eq!(decoded.weekday, 1);
        assert!(decoded.same_minute(&value));
        assert_eq!(decoded.second, 9);
    }
}
