//! File timestamps.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Timelike};
use serde::{Deserialize, Serialize};

/// Seconds between 1601-01-01 and 1970-01-01.
const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;
const TICKS_PER_SEC: u64 = 10_000_000;

/// 100 ns intervals since 1601-01-01 UTC.
///
/// Ordering compares the full 64-bit value, which is the same as comparing
/// the high word first and the low word second.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FileTime(u64);

impl FileTime {
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    pub const fn from_parts(high: u32, low: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    pub const fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn low(self) -> u32 {
        self.0 as u32
    }

    /// Times before 1601 saturate to zero.
    pub fn from_unix_secs(secs: i64) -> Self {
        let since_1601 = secs.saturating_add(EPOCH_DIFFERENCE_SECS).max(0) as u64;
        Self(since_1601.saturating_mul(TICKS_PER_SEC))
    }

    /// Whole seconds since the Unix epoch, rounding toward 1601.
    pub fn to_unix_secs(self) -> i64 {
        (self.0 / TICKS_PER_SEC) as i64 - EPOCH_DIFFERENCE_SECS
    }

    pub fn to_dos_date_time(self) -> DosDateTime {
        DosDateTime::from_unix_secs(self.to_unix_secs())
    }
}

/// `CompareFileTime`: -1, 0 or 1.
pub fn compare_file_time(a: FileTime, b: FileTime) -> i32 {
    match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Packed MS-DOS date and time, two-second resolution, UTC based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DosDateTime {
    /// `(year - 1980) << 9 | month << 5 | day`
    pub date: u16,
    /// `hour << 11 | minute << 5 | second / 2`
    pub time: u16,
}

impl DosDateTime {
    /// Years outside 1980..=2107 are clamped to the representable range.
    pub fn from_unix_secs(secs: i64) -> Self {
        let Some(stamp) = DateTime::from_timestamp(secs, 0) else {
            return Self::default();
        };
        let year = stamp.year().clamp(1980, 2107);
        let (month, day, hour, minute, second) = if stamp.year() == year {
            (
                stamp.month(),
                stamp.day(),
                stamp.hour(),
                stamp.minute(),
                stamp.second(),
            )
        } else if year == 1980 {
            (1, 1, 0, 0, 0)
        } else {
            (12, 31, 23, 59, 58)
        };

        Self {
            date: (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16,
            time: ((hour as u16) << 11) | ((minute as u16) << 5) | (second / 2) as u16,
        }
    }
}
