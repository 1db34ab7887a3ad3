//! Routing the `log` crate's macros into a [`RingLog`].

use log::{Log, Metadata, Record, SetLoggerError};

use crate::format::Location;
use crate::level::LogLevel;
use crate::logger::RingLog;

impl Log for RingLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        RingLog::enabled(self, metadata.level().into())
    }

    fn log(&self, record: &Record<'_>) {
        let location = Location::new(
            record.file_static().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
            record.module_path_static().unwrap_or("<unknown>"),
        );
        RingLog::log(self, record.level().into(), &location, *record.args());
    }

    fn flush(&self) {
        self.notify_worker();
    }
}

/// Installs `logger` as the process-wide `log` backend. The `log` max level
/// tracks the logger's minimum from then on, including later
/// [`set_level`](RingLog::set_level) and `configure` calls. Fails if a
/// backend is already set.
pub fn install_log_bridge(logger: &RingLog) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(logger.clone()))?;
    logger.mark_bridged();
    Ok(())
}
