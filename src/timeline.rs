//! # Half-Year Partitioning
//!
//! Splits a saved-track history into calendar half years:
//!
//! - **First half** (H1): months 0–5, January to June
//! - **Second half** (H2): months 6–11, July to December
//!
//! The windows run contiguously from the half year of the earliest save to
//! the half year of the latest save, both inclusive. A window in the earliest
//! year that ends before the earliest save is not emitted, nor is a window in
//! the latest year that starts after the latest save. Halves in between are
//! always emitted, even when nothing was saved in them. Every track lands in
//! exactly one window, keeping its relative input order.
//!
//! ## Scan modes
//!
//! The catalog lists saved tracks most recent first. [`ScanMode::Ordered`]
//! relies on that: it checks the order up front, then walks the history once,
//! closing each window as soon as an older save shows up. [`ScanMode::FullScan`]
//! makes no order assumption and buckets every track by its own date. On
//! correctly ordered input both produce identical windows.

use crate::error::{EngineError, Result};
use crate::timestamp::{IsoPrefix, TimestampFormat, YearMonth};
use crate::track::Track;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Half {
    First,
    Second,
}

impl Half {
    /// Half containing a 0-based month.
    #[must_use]
    pub const fn of_month0(month0: u8) -> Self {
        if month0 < 6 {
            Half::First
        } else {
            Half::Second
        }
    }

    /// Inclusive 0-based month range.
    #[must_use]
    pub const fn month_range(self) -> (u8, u8) {
        match self {
            Half::First => (0, 5),
            Half::Second => (6, 11),
        }
    }
}

/// A calendar half year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfYear {
    pub year: i32,
    pub half: Half,
}

impl HalfYear {
    #[must_use]
    pub const fn containing(date: YearMonth) -> Self {
        Self {
            year: date.year,
            half: Half::of_month0(date.month0()),
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self.half {
            Half::First => Self {
                year: self.year,
                half: Half::Second,
            },
            Half::Second => Self {
                year: self.year + 1,
                half: Half::First,
            },
        }
    }

    /// Half years elapsed since year 0, H1.
    const fn ordinal(self) -> i64 {
        self.year as i64 * 2
            + match self.half {
                Half::First => 0,
                Half::Second => 1,
            }
    }
}

impl fmt::Display for HalfYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.half {
            Half::First => write!(f, "First Half of {}", self.year),
            Half::Second => write!(f, "Second Half of {}", self.year),
        }
    }
}

/// Tracks saved during one half year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub period: HalfYear,
    /// Track uris in input order.
    pub tracks: Vec<String>,
}

impl TimeWindow {
    pub fn year(&self) -> i32 {
        self.period.year
    }

    pub fn half(&self) -> Half {
        self.period.half
    }

    pub fn month_range(&self) -> (u8, u8) {
        self.period.half.month_range()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Input must be most-recent-first; checked before partitioning.
    #[default]
    Ordered,
    /// Any input order.
    FullScan,
}

#[derive(Debug, Clone, Default)]
pub struct TimelinePartitioner<F = IsoPrefix> {
    mode: ScanMode,
    format: F,
}

impl TimelinePartitioner<IsoPrefix> {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            format: IsoPrefix,
        }
    }
}

impl<F: TimestampFormat> TimelinePartitioner<F> {
    /// Partitioner reading `added_at` through a custom format.
    pub fn with_format(mode: ScanMode, format: F) -> Self {
        Self { mode, format }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Splits `tracks` into half-year windows, earliest window first.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MalformedTimestamp`] if any `added_at` cannot be parsed
    /// - [`EngineError::OutOfOrderHistory`] in [`ScanMode::Ordered`] when a
    ///   track was saved after the one listed before it
    pub fn partition(&self, tracks: &[Track]) -> Result<Vec<TimeWindow>> {
        let dates = tracks
            .iter()
            .map(|t| self.format.parse(&t.added_at))
            .collect::<Result<Vec<YearMonth>>>()?;

        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return Ok(Vec::new());
        };

        let windows = match self.mode {
            ScanMode::Ordered => {
                check_descending(&dates)?;
                let mut windows = empty_windows(HalfYear::containing(last), HalfYear::containing(first));
                fill_ordered(&mut windows, tracks, &dates);
                windows
            }
            ScanMode::FullScan => {
                let earliest = dates.iter().min().copied().unwrap_or(last);
                let latest = dates.iter().max().copied().unwrap_or(first);
                let mut windows = empty_windows(HalfYear::containing(earliest), HalfYear::containing(latest));
                fill_full_scan(&mut windows, tracks, &dates);
                windows
            }
        };

        debug!(
            "Partitioned {} tracks into {} half-year windows ({:?} scan)",
            tracks.len(),
            windows.len(),
            self.mode
        );
        Ok(windows)
    }
}

/// Every half year from `earliest` through `latest`, with no tracks yet.
fn empty_windows(earliest: HalfYear, latest: HalfYear) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    let mut period = earliest;
    while period <= latest {
        windows.push(TimeWindow {
            period,
            tracks: Vec::new(),
        });
        period = period.next();
    }
    windows
}

fn check_descending(dates: &[YearMonth]) -> Result<()> {
    match dates.windows(2).position(|pair| pair[1] > pair[0]) {
        Some(position) => Err(EngineError::OutOfOrderHistory { index: position + 1 }),
        None => Ok(()),
    }
}

/// Single pass over most-recent-first input. Windows are visited newest
/// first; each one takes tracks from the cursor until an older save appears.
fn fill_ordered(windows: &mut [TimeWindow], tracks: &[Track], dates: &[YearMonth]) {
    let mut cursor = 0;
    for window in windows.iter_mut().rev() {
        while cursor < tracks.len() && HalfYear::containing(dates[cursor]) == window.period {
            window.tracks.push(tracks[cursor].uri.clone());
            cursor += 1;
        }
    }
    debug_assert_eq!(cursor, tracks.len(), "ordered scan left tracks unassigned");
}

fn fill_full_scan(windows: &mut [TimeWindow], tracks: &[Track], dates: &[YearMonth]) {
    let Some(base) = windows.first().map(|w| w.period.ordinal()) else {
        return;
    };
    for (track, &date) in tracks.iter().zip(dates) {
        let offset = HalfYear::containing(date).ordinal() - base;
        if let Some(window) = usize::try_from(offset).ok().and_then(|i| windows.get_mut(i)) {
            window.tracks.push(track.uri.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(dates: &[&str]) -> Vec<Track> {
        dates
            .iter()
            .enumerate()
            .map(|(i, date)| Track::new(format!("track{i}"), *date))
            .collect()
    }

    fn summary(windows: &[TimeWindow]) -> Vec<(String, Vec<String>)> {
        windows
            .iter()
            .map(|w| (w.period.to_string(), w.tracks.clone()))
            .collect()
    }

    fn both_modes(tracks: &[Track]) -> Vec<TimeWindow> {
        let ordered = TimelinePartitioner::new(ScanMode::Ordered).partition(tracks).unwrap();
        let full = TimelinePartitioner::new(ScanMode::FullScan).partition(tracks).unwrap();
        assert_eq!(ordered, full, "scan modes disagree");
        ordered
    }

    #[test]
    fn test_three_tracks_three_windows() {
        let tracks = history(&["2021-03-10T10:00:00Z", "2020-11-02T10:00:00Z", "2020-01-15T10:00:00Z"]);
        let windows = both_modes(&tracks);

        assert_eq!(
            summary(&windows),
            vec![
                ("First Half of 2020".to_string(), vec!["track2".to_string()]),
                ("Second Half of 2020".to_string(), vec!["track1".to_string()]),
                ("First Half of 2021".to_string(), vec!["track0".to_string()]),
            ]
        );
    }

    #[test]
    fn test_half_boundaries_june_and_july() {
        let tracks = history(&["2022-12-31", "2022-07-01", "2022-06-30", "2022-01-01"]);
        let windows = both_modes(&tracks);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].half(), Half::First);
        assert_eq!(windows[0].tracks, vec!["track2", "track3"]);
        assert_eq!(windows[0].month_range(), (0, 5));
        assert_eq!(windows[1].half(), Half::Second);
        assert_eq!(windows[1].tracks, vec!["track0", "track1"]);
        assert_eq!(windows[1].month_range(), (6, 11));
    }

    #[test]
    fn test_gaps_produce_empty_windows() {
        let tracks = history(&["2021-08-01", "2019-02-01"]);
        let windows = both_modes(&tracks);

        let names: Vec<String> = windows.iter().map(|w| w.period.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "First Half of 2019",
                "Second Half of 2019",
                "First Half of 2020",
                "Second Half of 2020",
                "First Half of 2021",
                "Second Half of 2021",
            ]
        );
        assert_eq!(windows[0].tracks, vec!["track1"]);
        assert_eq!(windows[5].tracks, vec!["track0"]);
        assert!(windows[1..5].iter().all(|w| w.tracks.is_empty()));
    }

    #[test]
    fn test_clipped_ends_of_the_history() {
        // Earliest save is in H2 and latest in H1: the H1 of the first year
        // and the H2 of the last year are not emitted.
        let tracks = history(&["2021-02-01", "2020-09-01"]);
        let windows = both_modes(&tracks);
        assert_eq!(summary(&windows).len(), 2);
        assert_eq!(windows[0].period, HalfYear { year: 2020, half: Half::Second });
        assert_eq!(windows[1].period, HalfYear { year: 2021, half: Half::First });
    }

    #[test]
    fn test_every_track_in_exactly_one_contiguous_window() {
        let dates: Vec<String> = (0..60)
            .map(|i| {
                let months_back = i * 2;
                let year = 2023 - months_back / 12;
                let month = 12 - months_back % 12;
                format!("{year:04}-{month:02}-15T00:00:00Z")
            })
            .collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let tracks = history(&refs);
        let windows = both_modes(&tracks);

        let total: usize = windows.iter().map(|w| w.tracks.len()).sum();
        assert_eq!(total, tracks.len());
        for pair in windows.windows(2) {
            assert_eq!(pair[0].period.next(), pair[1].period, "windows must be contiguous");
        }
        let mut seen: Vec<&String> = windows.iter().flat_map(|w| w.tracks.iter()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), tracks.len());
    }

    #[test]
    fn test_relative_order_is_kept_within_window() {
        let tracks = history(&["2020-05-30", "2020-05-02", "2020-03-01", "2020-01-09"]);
        let windows = both_modes(&tracks);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].tracks, vec!["track0", "track1", "track2", "track3"]);
    }

    #[test]
    fn test_empty_history() {
        assert!(both_modes(&[]).is_empty());
    }

    #[test]
    fn test_ordered_scan_rejects_unsorted_history() {
        let tracks = history(&["2020-01-01", "2021-06-01", "2019-03-01"]);
        let err = TimelinePartitioner::new(ScanMode::Ordered).partition(&tracks).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderHistory { index: 1 }));
    }

    #[test]
    fn test_full_scan_accepts_unsorted_history() {
        let tracks = history(&["2020-01-01", "2021-06-01", "2019-09-01"]);
        let windows = TimelinePartitioner::new(ScanMode::FullScan).partition(&tracks).unwrap();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].tracks, vec!["track2"]);
        assert_eq!(windows[1].tracks, vec!["track0"]);
        assert!(windows[2].tracks.is_empty());
        assert_eq!(windows[3].tracks, vec!["track1"]);
    }

    #[test]
    fn test_malformed_timestamp_fails_whole_partition() {
        let tracks = history(&["2021-03-01", "yesterday"]);
        for mode in [ScanMode::Ordered, ScanMode::FullScan] {
            let err = TimelinePartitioner::new(mode).partition(&tracks).unwrap_err();
            assert!(matches!(err, EngineError::MalformedTimestamp { .. }));
        }
    }

    #[test]
    fn test_custom_timestamp_format() {
        struct Compact;
        impl TimestampFormat for Compact {
            fn parse(&self, raw: &str) -> Result<YearMonth> {
                let year = raw.get(0..4).and_then(|y| y.parse().ok());
                let month = raw.get(4..6).and_then(|m| m.parse().ok());
                year.zip(month)
                    .and_then(|(y, m)| YearMonth::new(y, m))
                    .ok_or_else(|| EngineError::malformed(raw, "expected YYYYMM"))
            }
        }

        let tracks = history(&["202108", "202103"]);
        let windows = TimelinePartitioner::with_format(ScanMode::Ordered, Compact)
            .partition(&tracks)
            .unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].tracks, vec!["track1"]);
    }
}
