//! Wall-clock access for the logger.
//!
//! Stamping every line with a calendar date is the one part of the hot path
//! that would otherwise need a full date decomposition per call. The
//! [`ClockCache`] keeps the last breakdown and its fixed-width rendering, and
//! only redoes the expensive part when the minute changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone, Timelike, Utc};

/// Width of the rendered `YYYY-MM-DD HH:MM:SS` stamp.
pub const STAMP_LEN: usize = 19;

/// A point in time as whole seconds since the Unix epoch plus the
/// sub-second part in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub secs: u64,
    pub micros: u32,
}

impl Timestamp {
    pub const fn new(secs: u64, micros: u32) -> Self {
        Self { secs, micros }
    }

    pub const fn from_micros(total: u64) -> Self {
        Self {
            secs: total / 1_000_000,
            micros: (total % 1_000_000) as u32,
        }
    }

    pub const fn as_micros(&self) -> u64 {
        self.secs * 1_000_000 + self.micros as u64
    }

    /// Millisecond part, taken from the sub-second field.
    pub const fn millis(&self) -> u32 {
        self.micros / 1_000
    }
}

/// Source of wall-clock time. The logger reads it on every submission.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The platform wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Timestamp::new(d.as_secs(), d.subsec_micros()))
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
///
/// ```
/// # use ring_log::clock::{ManualClock, TimeSource, Timestamp};
/// # use std::time::Duration;
/// let clock = ManualClock::new(Timestamp::new(1_700_000_000, 0));
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!(clock.now(), Timestamp::new(1_700_000_001, 500_000));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            micros: AtomicU64::new(start.as_micros()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.micros.store(at.as_micros(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Which calendar the breakdown is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockZone {
    #[default]
    Local,
    Utc,
}

/// A calendar day, used to name and roll log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CivilDate {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// `YYYYMMDD`, as embedded in file names.
    pub fn compact(&self) -> String {
        format!("{}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// Cached calendar breakdown of the most recent timestamp.
///
/// `refresh` is cheap when called repeatedly within the same second (nothing
/// to do) or the same minute (only the seconds digits are rewritten). Only a
/// minute change pays for a full timezone-aware decomposition.
#[derive(Debug, Clone)]
pub struct ClockCache {
    zone: ClockZone,
    cached_sec: u64,
    cached_min: u64,
    date: CivilDate,
    hour: u32,
    minute: u32,
    second: u32,
    text: [u8; STAMP_LEN],
}

impl ClockCache {
    pub fn new(zone: ClockZone, now: Timestamp) -> Self {
        let mut cache = Self {
            zone,
            cached_sec: now.secs,
            cached_min: now.secs / 60,
            date: CivilDate::new(1970, 1, 1),
            hour: 0,
            minute: 0,
            second: 0,
            text: [b'0'; STAMP_LEN],
        };
        cache.decompose(now.secs);
        cache
    }

    /// Brings the breakdown up to `now` and returns its millisecond part.
    pub fn refresh(&mut self, now: Timestamp) -> u32 {
        if now.secs != self.cached_sec {
            let minute = now.secs / 60;
            if minute != self.cached_min {
                self.decompose(now.secs);
            } else {
                self.second = (now.secs % 60) as u32;
                put_two_digits(&mut self.text[17..19], self.second);
            }
            self.cached_sec = now.secs;
            self.cached_min = minute;
        }
        now.millis()
    }

    pub fn zone(&self) -> ClockZone {
        self.zone
    }

    pub fn date(&self) -> CivilDate {
        self.date
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    /// The breakdown rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text).unwrap_or("0000-00-00 00:00:00")
    }

    fn decompose(&mut self, secs: u64) {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        let naive = match self.zone {
            ClockZone::Utc => DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.naive_utc()),
            ClockZone::Local => Local.timestamp_opt(secs, 0).earliest().map(|t| t.naive_local()),
        }
        .unwrap_or_default();
        self.apply(naive);
    }

    fn apply(&mut self, t: NaiveDateTime) {
        self.date = CivilDate::new(t.year(), t.month(), t.day());
        self.hour = t.hour();
        self.minute = t.minute();
        self.second = t.second();

        let year = t.year().clamp(0, 9999) as u32;
        put_two_digits(&mut self.text[0..2], year / 100);
        put_two_digits(&mut self.text[2..4], year % 100);
        self.text[4] = b'-';
        put_two_digits(&mut self.text[5..7], self.date.month);
        self.text[7] = b'-';
        put_two_digits(&mut self.text[8..10], self.date.day);
        self.text[10] = b' ';
        put_two_digits(&mut self.text[11..13], self.hour);
        self.text[13] = b':';
        put_two_digits(&mut self.text[14..16], self.minute);
        self.text[16] = b':';
        put_two_digits(&mut self.text[17..19], self.second);
    }
}

#[inline]
fn put_two_digits(dst: &mut [u8], value: u32) {
    dst[0] = b'0' + ((value / 10) % 10) as u8;
    dst[1] = b'0' + (value % 10) as u8;
}
