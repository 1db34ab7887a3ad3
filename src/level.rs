use std::fmt;
use std::str::FromStr;

use crate::error::RingLogError;

/// Severity of a log line.
///
/// Numerically ascending values are *less* severe: a logger configured at
/// `Info` accepts `Fatal`, `Error`, `Warn` and `Info`, and filters `Debug`
/// and `Trace`. `Fatal` is never filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    Trace = 6,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Maps any integer onto the enumeration, clamping out-of-range values
    /// to the nearest end.
    pub fn from_raw_clamped(raw: i64) -> Self {
        match raw {
            i64::MIN..=1 => LogLevel::Fatal,
            2 => LogLevel::Error,
            3 => LogLevel::Warn,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// The bracketed tag stamped at the start of every line.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Fatal => "[FATAL]",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Info => "[INFO]",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Whether a line of severity `self` passes a logger whose minimum is `min`.
    #[inline]
    pub fn passes(self, min: LogLevel) -> bool {
        self == LogLevel::Fatal || self <= min
    }

    pub(crate) fn to_log_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Fatal | LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = RingLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i64>() {
            return Ok(LogLevel::from_raw_clamped(raw));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(RingLogError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: fatal, error, warn, info, debug, trace",
                other
            ))),
        }
    }
}
