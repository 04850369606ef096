//! Parsing of `added_at` values into a calendar month.
//!
//! Partitioning only ever needs the year and month of a save, so the parse
//! step produces a [`YearMonth`] and nothing else. New serializations plug in
//! through [`TimestampFormat`] without touching the partitioner.

use crate::error::{EngineError, Result};
use std::fmt;
use std::str::FromStr;

/// Year and 1-based month of a saved track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1 = January, 12 = December.
    pub month: u8,
}

impl YearMonth {
    /// Builds a `YearMonth`, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// 0-based month, 0 = January.
    #[must_use]
    pub const fn month0(self) -> u8 {
        self.month - 1
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        IsoPrefix.parse(s)
    }
}

/// Turns a raw timestamp into a [`YearMonth`].
pub trait TimestampFormat {
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedTimestamp`] when `raw` does not carry a
    /// year and month in the expected shape.
    fn parse(&self, raw: &str) -> Result<YearMonth>;
}

/// ISO-8601 style prefix: four year digits, a `-`, two month digits
/// (`YYYY-MM…`). Anything after the month is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoPrefix;

impl TimestampFormat for IsoPrefix {
    fn parse(&self, raw: &str) -> Result<YearMonth> {
        let year_digits = raw
            .get(0..4)
            .ok_or_else(|| EngineError::malformed(raw, "too short for a year"))?;
        if raw.as_bytes().get(4) != Some(&b'-') {
            return Err(EngineError::malformed(raw, "expected `-` after the year"));
        }
        let month_digits = raw
            .get(5..7)
            .ok_or_else(|| EngineError::malformed(raw, "too short for a month"))?;

        if !year_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EngineError::malformed(raw, "year is not four digits"));
        }
        if !month_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EngineError::malformed(raw, "month is not two digits"));
        }

        let year: i32 = year_digits
            .parse()
            .map_err(|_| EngineError::malformed(raw, "year is not four digits"))?;
        let month: u8 = month_digits
            .parse()
            .map_err(|_| EngineError::malformed(raw, "month is not two digits"))?;

        YearMonth::new(year, month).ok_or_else(|| EngineError::malformed(raw, "month out of range"))
    }
}
