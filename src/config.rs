use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::clock::ClockZone;
use crate::error::RingLogError;
use crate::level::LogLevel;

pub const DEFAULT_CELL_CAPACITY: usize = 30 * 1024 * 1024;
pub const DEFAULT_INITIAL_CELLS: usize = 3;
pub const DEFAULT_MEMORY_CEILING: usize = 3 * 1024 * 1024 * 1024;
pub const DEFAULT_FILE_SIZE_CEILING: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(5);
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`RingLog`](crate::RingLog).
#[derive(Debug, Clone)]
pub struct RingLogConfig {
    /// Directory the log files go to. Created on configure if absent.
    pub directory: PathBuf,
    /// First component of every file name.
    pub program_name: String,
    /// Least severe level that is still written.
    pub min_level: LogLevel,
    /// Bytes per cell. Every cell in the ring has the same capacity.
    pub cell_capacity: usize,
    /// Cells allocated up front.
    pub initial_cells: usize,
    /// Upper bound on cell count times cell capacity.
    pub memory_ceiling: usize,
    /// A file at or above this size is rotated before the next write.
    pub file_size_ceiling: u64,
    /// Formatted lines are truncated to this many bytes.
    pub max_line_len: usize,
    /// After a dropped line, further submissions are ignored for this long.
    pub throttle_window: Duration,
    /// Longest the worker sleeps without a producer signal.
    pub drain_interval: Duration,
    /// Calendar used for line stamps and file dates.
    pub zone: ClockZone,
}

impl Default for RingLogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            program_name: "app".to_string(),
            min_level: LogLevel::Info,
            cell_capacity: DEFAULT_CELL_CAPACITY,
            initial_cells: DEFAULT_INITIAL_CELLS,
            memory_ceiling: DEFAULT_MEMORY_CEILING,
            file_size_ceiling: DEFAULT_FILE_SIZE_CEILING,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            zone: ClockZone::Local,
        }
    }
}

impl RingLogConfig {
    /// Create configuration from `RING_LOG_*` environment variables, using
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self, RingLogError> {
        let defaults = Self::default();
        let config = Self {
            directory: env::var("RING_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            program_name: env::var("RING_LOG_PROGRAM").unwrap_or(defaults.program_name),
            min_level: match env::var("RING_LOG_LEVEL") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.min_level,
            },
            cell_capacity: parse_var("RING_LOG_CELL_BYTES")?.unwrap_or(defaults.cell_capacity),
            initial_cells: parse_var("RING_LOG_INITIAL_CELLS")?
                .unwrap_or(defaults.initial_cells),
            memory_ceiling: parse_var("RING_LOG_MEMORY_LIMIT")?
                .unwrap_or(defaults.memory_ceiling),
            file_size_ceiling: parse_var("RING_LOG_FILE_LIMIT")?
                .unwrap_or(defaults.file_size_ceiling),
            max_line_len: parse_var("RING_LOG_LINE_LIMIT")?.unwrap_or(defaults.max_line_len),
            throttle_window: parse_var("RING_LOG_THROTTLE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.throttle_window),
            drain_interval: parse_var("RING_LOG_DRAIN_MILLIS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.drain_interval),
            zone: match env::var("RING_LOG_UTC") {
                Ok(val) if matches!(val.to_lowercase().as_str(), "1" | "true" | "yes") => {
                    ClockZone::Utc
                }
                _ => defaults.zone,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RingLogError> {
        if self.cell_capacity == 0 {
            return Err(RingLogError::InvalidConfig(
                "cell capacity must be greater than 0".to_string(),
            ));
        }
        if self.initial_cells == 0 {
            return Err(RingLogError::InvalidConfig(
                "at least one initial cell is required".to_string(),
            ));
        }
        let initial_bytes = self.initial_cells.checked_mul(self.cell_capacity);
        if initial_bytes.map_or(true, |bytes| bytes > self.memory_ceiling) {
            return Err(RingLogError::InvalidConfig(format!(
                "{} initial cells of {} bytes exceed the memory ceiling of {} bytes",
                self.initial_cells, self.cell_capacity, self.memory_ceiling
            )));
        }
        if self.max_line_len == 0 || self.max_line_len > self.cell_capacity {
            return Err(RingLogError::InvalidConfig(format!(
                "max line length must be between 1 and the cell capacity ({} bytes)",
                self.cell_capacity
            )));
        }
        if self.file_size_ceiling == 0 {
            return Err(RingLogError::InvalidConfig(
                "file size ceiling must be greater than 0".to_string(),
            ));
        }
        validate_program_name(&self.program_name)?;
        Ok(())
    }
}

pub(crate) fn validate_program_name(name: &str) -> Result<(), RingLogError> {
    if name.trim().is_empty() {
        return Err(RingLogError::InvalidConfig(
            "program name cannot be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(RingLogError::InvalidConfig(format!(
            "program name '{}' must not contain a path separator",
            name
        )));
    }
    Ok(())
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, RingLogError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RingLogError::InvalidConfig(format!("{} has an unparsable value '{}'", key, raw))
        }),
        Err(_) => Ok(None),
    }
}
