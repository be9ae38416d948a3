//! Snapshot naming and lookup.
//!
//! A snapshot directory is named `YYYYMMDD_HHMM` after the local time it was
//! captured at. Names order by `(day, minute)`, so the greatest stamp under a
//! backup root is the most recent snapshot.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use tracing::debug;

use crate::error::{Error, Result};

const DAY_DIGITS: usize = 8;
const MINUTE_DIGITS: usize = 4;
const SEPARATOR: u8 = b'_';

/// The `(day, minute)` pair a snapshot directory is named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotStamp {
    /// `YYYYMMDD` as an integer.
    pub day: u32,
    /// `HHMM` as an integer.
    pub minute: u32,
}

impl SnapshotStamp {
    /// Stamp for the current local time.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Stamp for `time`, truncated to the minute.
    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        let year = u32::try_from(time.year()).unwrap_or_default();
        Self {
            day: year * 10_000 + time.month() * 100 + time.day(),
            minute: time.hour() * 100 + time.minute(),
        }
    }

    /// Parses a snapshot directory name.
    ///
    /// Only exactly eight ASCII digits, `_` and four ASCII digits are
    /// accepted. Anything else, including extra leading or trailing
    /// characters, yields `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != DAY_DIGITS + 1 + MINUTE_DIGITS || bytes[DAY_DIGITS] != SEPARATOR {
            return None;
        }
        let (day, minute) = (&bytes[..DAY_DIGITS], &bytes[DAY_DIGITS + 1..]);
        Some(Self {
            day: parse_digits(day)?,
            minute: parse_digits(minute)?,
        })
    }
}

fn parse_digits(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + u32::from(b - b'0'))
    })
}

impl fmt::Display for SnapshotStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}_{:04}", self.day, self.minute)
    }
}

/// Finds the most recent snapshot under `backup_root`.
///
/// Returns `Ok(None)` when the directory is missing, unreadable, or holds no
/// snapshot-shaped entries. That is a first-time backup, not an error.
///
/// # Errors
/// Returns [`Error::SnapshotScan`] if the listing breaks off part way.
pub fn latest_snapshot(backup_root: &Path) -> Result<Option<SnapshotStamp>> {
    let entries = match fs::read_dir(backup_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(root = %backup_root.display(), error = %e, "no snapshots to compare against");
            return Ok(None);
        }
    };

    let mut latest = None;
    for entry in entries {
        let entry = entry.map_err(|source| Error::SnapshotScan {
            path: backup_root.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(stamp) = name.to_str().and_then(SnapshotStamp::parse) else {
            continue;
        };
        latest = latest.max(Some(stamp));
    }
    Ok(latest)
}
