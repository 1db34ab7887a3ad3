//! The process-wide logger instance.
//!
//! The instance is built on first access from `RING_LOG_*` environment
//! variables (see [`RingLogConfig::from_env`]), falling back to the defaults
//! if those don't parse. It lives for the rest of the process. [`init`]
//! points it at a directory and starts its worker; keep the returned handle
//! alive in `main` and drop it (or call `shutdown`) on the way out to flush.

use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::clock::SystemClock;
use crate::config::RingLogConfig;
use crate::error::Result;
use crate::level::LogLevel;
use crate::logger::RingLog;
use crate::worker::WorkerHandle;

lazy_static! {
    static ref GLOBAL: RingLog = {
        let config = RingLogConfig::from_env().unwrap_or_else(|err| {
            eprintln!("ring_log: {}; using default configuration", err);
            RingLogConfig::default()
        });
        RingLog::build(config, Arc::new(SystemClock))
    };
}

/// The shared instance. Built on first call.
pub fn global() -> &'static RingLog {
    &GLOBAL
}

/// Configures the shared instance and starts its persistence worker.
pub fn init(directory: impl AsRef<Path>, program_name: &str, level: LogLevel) -> Result<WorkerHandle> {
    let logger = global();
    logger.configure(directory, program_name, level)?;
    logger.start()
}
