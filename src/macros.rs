//! Call-site macros.
//!
//! Each macro checks the level first, so a filtered line costs one atomic
//! load and no formatting. The line is stamped with the call site's file,
//! line and enclosing function.
//!
//! ```
//! # use ring_log::{log_warn, log_line, LogLevel, RingLog, RingLogConfig};
//! # let config = RingLogConfig { cell_capacity: 4096, memory_ceiling: 16384, ..Default::default() };
//! let logger = RingLog::new(config).unwrap();
//! log_warn!(logger, "disk {} at {}%", "/dev/sda1", 91);
//! log_line!(logger, LogLevel::Error, "retrying in {}s", 5);
//! assert_eq!(logger.stats().lines_stored, 2);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __ring_log_location {
    () => {{
        fn __ring_log_here() {}
        fn __ring_log_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::format::Location::new(
            file!(),
            line!(),
            $crate::format::enclosing_function(__ring_log_name_of(__ring_log_here)),
        )
    }};
}

/// Logs a line at the given [`LogLevel`](crate::LogLevel).
#[macro_export]
macro_rules! log_line {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.enabled(level) {
            logger.log(level, &$crate::__ring_log_location!(), format_args!($($arg)+));
        }
    }};
}

/// Logs at `FATAL`. Never filtered by level.
#[macro_export]
macro_rules! log_fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_line!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}
