//! # Ring Log
//!
//! An in-process text logger built so that application threads never wait on
//! the disk:
//!
//! * **Non-blocking producers**: a log call formats its line and copies it into
//!   memory under a short lock. No I/O happens on the calling thread.
//! * **Single writer**: one background worker drains filled buffers to disk,
//!   so files are only ever touched by one thread.
//! * **Bounded memory**: the buffer ring grows under bursts but never past a
//!   configured ceiling; beyond it lines are dropped and further logging is
//!   throttled for a few seconds rather than exhausting memory.
//! * **Rotation**: one file per program, day and process, split into numbered
//!   siblings when it reaches a size ceiling.
//!
//! ## Main Components
//!
//! * `RingLog`: the front end; level filter, throttle and append path
//! * `ring_pool`: the circular pool of cells producers fill and the worker drains
//! * `cell_buffer`: a fixed-capacity append-only byte region
//! * `rotation`: file naming and day/size rotation
//! * `WorkerHandle`: owner of the persistence thread, flushes on shutdown
//! * `clock`: cached calendar breakdown for line stamps
//!
//! ## Quick Start
//!
//! ```
//! use ring_log::{log_error, log_info, LogLevel, RingLog, RingLogConfig};
//!
//! let dir = std::env::temp_dir().join(format!("ring_log_quickstart_{}", std::process::id()));
//! let config = RingLogConfig {
//!     directory: dir.clone(),
//!     program_name: "quickstart".to_string(),
//!     min_level: LogLevel::Info,
//!     cell_capacity: 1024 * 1024,
//!     memory_ceiling: 8 * 1024 * 1024,
//!     ..Default::default()
//! };
//! let (logger, worker) = RingLog::open(config).unwrap();
//!
//! log_info!(logger, "Temperature: {} C", 25.5);
//! log_error!(logger, "Status: {}, Count: {}", false, 42);
//!
//! // Flush what's buffered and stop the worker
//! worker.shutdown();
//! assert_eq!(logger.stats().lines_stored, 2);
//! # std::fs::remove_dir_all(&dir).ok();
//! ```

pub mod bridge;
pub mod cell_buffer;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod global;
pub mod level;
pub mod logger;
mod macros;
pub mod ring_pool;
pub mod rotation;
pub mod worker;

pub use bridge::install_log_bridge;
pub use config::RingLogConfig;
pub use error::{Result, RingLogError};
pub use format::Location;
pub use global::{global, init};
pub use level::LogLevel;
pub use logger::{RingLog, RingStats};
pub use worker::WorkerHandle;
