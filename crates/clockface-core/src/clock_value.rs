//! Calendar value kept by the real-time clock chip
//!
//! [`ClockValue`] is the decoded register set of the clock chip. It is only
//! ever changed through the bounded field adjustments used by the editing
//! interaction, or replaced wholesale by a successful protocol read or a
//! validated 14-digit `YYYYMMDDhhmmss` request.

use core::fmt::{self, Write};
use core::str::FromStr;

use thiserror_no_std::Error;

/// First representable year (year offset 0).
pub const BASE_YEAR: u16 = 2000;

/// Last representable year (year offset 99).
pub const LAST_YEAR: u16 = 2099;

/// Length of the compact `YYYYMMDDhhmmss` representation.
pub const COMPACT_LEN: usize = 14;

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A named clock field, used when reporting range violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Weekday,
}

impl fmt::Display for ClockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Weekday => "weekday",
        };
        f.write_str(name)
    }
}

/// Fields the user can step through while editing, in edit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl EditField {
    /// The field that follows this one. `Second` is the last field and
    /// wraps back to `Year`.
    pub const fn next(self) -> Self {
        match self {
            Self::Year => Self::Month,
            Self::Month => Self::Day,
            Self::Day => Self::Hour,
            Self::Hour => Self::Minute,
            Self::Minute => Self::Second,
            Self::Second => Self::Year,
        }
    }

    pub const fn clock_field(self) -> ClockField {
        match self {
            Self::Year => ClockField::Year,
            Self::Month => ClockField::Month,
            Self::Day => ClockField::Day,
            Self::Hour => ClockField::Hour,
            Self::Minute => ClockField::Minute,
            Self::Second => ClockField::Second,
        }
    }
}

/// Rejection reasons for a compact `YYYYMMDDhhmmss` request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 14 digits, got {len} bytes")]
    WrongLength { len: usize },
    #[error("byte {index} is not a decimal digit")]
    NotDigit { index: usize },
    #[error("{field} is out of range")]
    OutOfRange { field: ClockField },
}

/// Number of days in `month` of `year`.
///
/// The leap rule is the plain divisible-by-four rule, which is exact for the
/// 2000-2099 range the clock chip can represent. Out-of-range months are
/// clamped into 1..=12.
pub const fn days_in_month(year: u16, month: u8) -> u8 {
    let month = if month < 1 {
        1
    } else if month > 12 {
        12
    } else {
        month
    };

    if month == 2 && year % 4 == 0 {
        29
    } else {
        DAYS_IN_MONTH[(month - 1) as usize]
    }
}

/// ISO weekday (1 = Monday .. 7 = Sunday) of a calendar date.
pub const fn weekday_of(year: u16, month: u8, day: u8) -> u8 {
    const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

    let y = if month < 3 { year - 1 } else { year };
    let sunday_based = (y + y / 4 - y / 100 + y / 400 + OFFSETS[(month - 1) as usize] + day as u16) % 7;

    if sunday_based == 0 { 7 } else { sunday_based as u8 }
}

/// Wrap `value` into the inclusive range `lo..=hi`.
const fn wrap(value: i16, lo: i16, hi: i16) -> i16 {
    lo + (value - lo).rem_euclid(hi - lo + 1)
}

/// Decoded clock registers.
///
/// `year` is an offset from [`BASE_YEAR`]; `weekday` is 1..=7 with the
/// meaning left to the writer (parsed requests use 1 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockValue {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub weekday: u8,
    pub year: u8,
}

impl Default for ClockValue {
    /// 2000-01-01 00:00:00, a Saturday.
    fn default() -> Self {
        Self {
            second: 0,
            minute: 0,
            hour: 0,
            day: 1,
            month: 1,
            weekday: 6,
            year: 0,
        }
    }
}

impl ClockValue {
    /// Build a value from a full calendar date, deriving the weekday.
    pub fn from_calendar(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, ClockField> {
        if !(BASE_YEAR..=LAST_YEAR).contains(&year) {
            return Err(ClockField::Year);
        }
        if !(1..=12).contains(&month) {
            return Err(ClockField::Month);
        }
        let value = Self {
            second,
            minute,
            hour,
            day,
            month,
            weekday: weekday_of(year, month.max(1), day.max(1)),
            year: (year - BASE_YEAR) as u8,
        };
        value.check()?;
        Ok(value)
    }

    /// Full four-digit year.
    pub const fn full_year(&self) -> u16 {
        BASE_YEAR + self.year as u16
    }

    /// Days in the month this value currently points at.
    pub const fn month_length(&self) -> u8 {
        days_in_month(self.full_year(), self.month)
    }

    /// Verify every field against its range, including the day-of-month
    /// against the month length. The weekday is not checked; chips power up
    /// with arbitrary weekday contents and it never feeds the calendar.
    pub fn check(&self) -> Result<(), ClockField> {
        if self.year > 99 {
            return Err(ClockField::Year);
        }
        if !(1..=12).contains(&self.month) {
            return Err(ClockField::Month);
        }
        if self.day < 1 || self.day > self.month_length() {
            return Err(ClockField::Day);
        }
        if self.hour > 23 {
            return Err(ClockField::Hour);
        }
        if self.minute > 59 {
            return Err(ClockField::Minute);
        }
        if self.second > 59 {
            return Err(ClockField::Second);
        }
        Ok(())
    }

    /// Step one field by `delta`, wrapping within the field's range.
    ///
    /// Changing the year or month re-clamps the day so the value never
    /// points past the end of its month.
    pub fn adjust(&mut self, field: EditField, delta: i8) {
        let delta = delta as i16;
        match field {
            EditField::Year => {
                self.year = wrap(self.year as i16 + delta, 0, 99) as u8;
                self.clamp_day();
            }
            EditField::Month => {
                self.month = wrap(self.month as i16 + delta, 1, 12) as u8;
                self.clamp_day();
            }
            EditField::Day => {
                self.clamp_day();
                let last = self.month_length() as i16;
                self.day = wrap(self.day as i16 + delta, 1, last) as u8;
            }
            EditField::Hour => self.hour = wrap(self.hour as i16 + delta, 0, 23) as u8,
            EditField::Minute => self.minute = wrap(self.minute as i16 + delta, 0, 59) as u8,
            EditField::Second => self.second = wrap(self.second as i16 + delta, 0, 59) as u8,
        }
    }

    fn clamp_day(&mut self) {
        self.day = self.day.clamp(1, self.month_length());
    }

    /// The value one second later, carrying into every larger field.
    /// The year offset wraps from 99 back to 0.
    pub fn next_second(mut self) -> Self {
        self.second += 1;
        if self.second < 60 {
            return self;
        }
        self.second = 0;
        self.minute += 1;
        if self.minute < 60 {
            return self;
        }
        self.minute = 0;
        self.hour += 1;
        if self.hour < 24 {
            return self;
        }
        self.hour = 0;
        self.weekday = self.weekday % 7 + 1;
        self.day += 1;
        if self.day <= self.month_length() {
            return self;
        }
        self.day = 1;
        self.month += 1;
        if self.month <= 12 {
            return self;
        }
        self.month = 1;
        self.year = (self.year + 1) % 100;
        self
    }

    /// Whether both values agree on everything from the year down to the
    /// minute. Seconds are ignored since the chip keeps counting.
    pub fn same_minute(&self, other: &Self) -> bool {
        self.year == other.year
            && self.month == other.month
            && self.day == other.day
            && self.hour == other.hour
            && self.minute == other.minute
    }

    /// Parse a compact `YYYYMMDDhhmmss` request.
    ///
    /// Surrounding ASCII whitespace (such as a trailing newline) is ignored.
    /// Nothing is returned unless every field is in range, and the weekday
    /// is derived from the date.
    pub fn parse_compact(input: &[u8]) -> Result<Self, ParseError> {
        let digits = input.trim_ascii();
        if digits.len() != COMPACT_LEN {
            return Err(ParseError::WrongLength { len: digits.len() });
        }
        if let Some(index) = digits.iter().position(|b| !b.is_ascii_digit()) {
            return Err(ParseError::NotDigit { index });
        }

        let number = |start: usize, len: usize| {
            digits[start..start + len]
                .iter()
                .fold(0u16, |acc, b| acc * 10 + (b - b'0') as u16)
        };

        let year = number(0, 4);
        let month = number(4, 2) as u8;
        let day = number(6, 2) as u8;
        let hour = number(8, 2) as u8;
        let minute = number(10, 2) as u8;
        let second = number(12, 2) as u8;

        Self::from_calendar(year, month, day, hour, minute, second)
            .map_err(|field| ParseError::OutOfRange { field })
    }

    /// Write the compact `YYYYMMDDhhmmss` representation.
    pub fn write_compact<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            self.full_year(),
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

impl FromStr for ClockValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_compact(s.as_bytes())
    }
}

impl fmt::Display for ClockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.full_year(),
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(year: u16, month: u8, day: u8) -> ClockValue {
        ClockValue::from_calendar(year, month, day, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2023, 4), 30);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn test_month_full_cycle_returns_to_start() {
        let mut v = value(2023, 7, 15);
        for _ in 0..12 {
            v.adjust(EditField::Month, 1);
        }
        assert_eq!(v.month, 7);
        assert_eq!(v.day, 15);
    }

    #[test]
    fn test_day_full_cycle_returns_to_start() {
        let mut v = value(2024, 2, 1);
        for _ in 0..days_in_month(2024, 2) {
            v.adjust(EditField::Day, 1);
        }
        assert_eq!(v.day, 1);
    }

    #[test]
    fn test_field_wraparound() {
        let mut v = value(2099, 12, 31);
        v.adjust(EditField::Year, 1);
        assert_eq!(v.full_year(), 2000);
        v.adjust(EditField::Year, -1);
        assert_eq!(v.full_year(), 2099);

        v.adjust(EditField::Month, 1);
        assert_eq!(v.month, 1);
        v.adjust(EditField::Month, -1);
        assert_eq!(v.month, 12);

        v.adjust(EditField::Day, 1);
        assert_eq!(v.day, 1);
        v.adjust(EditField::Day, -1);
        assert_eq!(v.day, 31);

        v.hour = 23;
        v.adjust(EditField::Hour, 1);
        assert_eq!(v.hour, 0);
        v.adjust(EditField::Hour, -1);
        assert_eq!(v.hour, 23);

        v.minute = 0;
        v.adjust(EditField::Minute, -1);
        assert_eq!(v.minute, 59);
        v.second = 59;
        v.adjust(EditField::Second, 1);
        assert_eq!(v.second, 0);
    }

    #[test]
    fn test_day_reclamped_on_month_and_year_change() {
        let mut v = value(2024, 1, 31);
        v.adjust(EditField::Month, 1);
        assert_eq!((v.month, v.day), (2, 29));

        v.adjust(EditField::Year, 1);
        assert_eq!((v.full_year(), v.day), (2025, 28));
        assert!(v.check().is_ok());
    }

    #[test]
    fn test_parse_valid_request() {
        let v = ClockValue::parse_compact(b"20240229235958\n").unwrap();
        assert_eq!(v.full_year(), 2024);
        assert_eq!((v.month, v.day), (2, 29));
        assert_eq!((v.hour, v.minute, v.second), (23, 59, 58));
        // 2024-02-29 was a Thursday
        assert_eq!(v.weekday, 4);
    }

    #[test]
    fn test_parse_rejects_bad_requests() {
        assert_eq!(
            ClockValue::parse_compact(b"20231350120000"),
            Err(ParseError::OutOfRange {
                field: ClockField::Month
            })
        );
        assert_eq!(
            ClockValue::parse_compact(b"2023120112000"),
            Err(ParseError::WrongLength { len: 13 })
        );
        assert_eq!(
            ClockValue::parse_compact(b"2023120112a000"),
            Err(ParseError::NotDigit { index: 10 })
        );
        assert_eq!(
            "19991201120000".parse::<ClockValue>(),
            Err(ParseError::OutOfRange {
                field: ClockField::Year
            })
        );
        assert_eq!(
            "20231201126000".parse::<ClockValue>(),
            Err(ParseError::OutOfRange {
                field: ClockField::Minute
            })
        );
    }

    #[test]
    fn test_compact_and_display_formatting() {
        let v = value(2025, 12, 17);
        let mut compact = heapless::String::<16>::new();
        v.write_compact(&mut compact).unwrap();
        assert_eq!(compact.as_str(), "20251217123045");

        let mut text = heapless::String::<24>::new();
        write!(text, "{}", v).unwrap();
        assert_eq!(text.as_str(), "2025-12-17 12:30:45");
    }

    #[test]
    fn test_weekday_of_known_dates() {
        assert_eq!(weekday_of(2000, 1, 1), 6);
        assert_eq!(weekday_of(2024, 1, 1), 1);
        assert_eq!(weekday_of(2025, 12, 21), 7);
    }

    #[test]
    fn test_next_second_carries_through_new_year() {
        let v = ClockValue::from_calendar(2023, 12, 31, 23, 59, 59).unwrap();
        let next = v.next_second();
        assert_eq!(next.full_year(), 2024);
        assert_eq!((next.month, next.day), (1, 1));
        assert_eq!((next.hour, next.minute, next.second), (0, 0, 0));
        assert_eq!(next.weekday, 1);
    }
}
