use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::clock::{
    CivilDate, ClockCache, ClockZone, SystemClock, TimeSource, Timestamp, STAMP_LEN,
};
use crate::config::{validate_program_name, RingLogConfig};
use crate::diagnostics::{self, Diagnostic};
use crate::error::{Result, RingLogError};
use crate::format::{render_line, Location};
use crate::level::LogLevel;
use crate::ring_pool::{AppendOutcome, RingPool};
use crate::rotation::FileTarget;
use crate::worker::WorkerHandle;

thread_local! {
    static LINE: RefCell<String> = RefCell::new(String::new());
    static CLOCK: RefCell<Option<ClockCache>> = const { RefCell::new(None) };
}

/// Brings this thread's clock cache up to `now` and hands it to `f` along
/// with the millisecond part. The cache is a pure function of the time and
/// zone, so every logger on the thread can share it.
fn with_clock<R>(zone: ClockZone, now: Timestamp, f: impl FnOnce(&ClockCache, u32) -> R) -> R {
    CLOCK.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().map_or(false, |cache| cache.zone() != zone) {
            *slot = None;
        }
        let cache = slot.get_or_insert_with(|| ClockCache::new(zone, now));
        let millis = cache.refresh(now);
        f(cache, millis)
    })
}

/// The logger front end: level filtering, throttling and the append path.
///
/// Producers on any number of threads call [`log`](RingLog::log) (usually
/// through the `log_info!` family of macros) or [`submit`](RingLog::submit)
/// with a pre-rendered line. Lines land in an in-memory [`RingPool`]; a
/// single [`WorkerHandle`] thread drains sealed cells to disk.
///
/// A producer never waits on disk. Its critical section is cursor
/// bookkeeping plus one bounded copy, and when the ring is saturated the line
/// is dropped rather than the producer blocked. After a drop every further
/// submission is ignored until the throttle window has passed, so a log storm
/// can't feed the overload that caused it. `Fatal` lines are exempt from the
/// window but not from saturation.
///
/// `RingLog` is a cheap handle; clones share the same ring.
///
/// # Examples
///
/// ```
/// use ring_log::{log_info, LogLevel, RingLog, RingLogConfig};
///
/// let dir = std::env::temp_dir().join(format!("ring_log_doc_{}", std::process::id()));
/// let config = RingLogConfig {
///     cell_capacity: 64 * 1024,
///     memory_ceiling: 1024 * 1024,
///     ..Default::default()
/// };
/// let logger = RingLog::new(config).unwrap();
/// logger.configure(&dir, "doc", LogLevel::Info).unwrap();
/// let worker = logger.start().unwrap();
///
/// log_info!(logger, "listening on port {}", 8080);
///
/// // flushes whatever is buffered and joins the worker
/// worker.shutdown();
/// # std::fs::remove_dir_all(&dir).ok();
/// ```
#[derive(Clone)]
pub struct RingLog {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<RingState>,
    pub(crate) wakeup: Condvar,
    pub(crate) config: RingLogConfig,
    pub(crate) counters: Counters,
    pub(crate) worker_started: AtomicBool,
    level: AtomicU8,
    configured: AtomicBool,
    /// Microsecond timestamp of the last drop, 0 when none.
    suppressed_at: AtomicU64,
    /// Set once this logger is the `log` crate backend.
    pub(crate) bridged: AtomicBool,
    time: Arc<dyn TimeSource>,
}

pub(crate) struct RingState {
    pub(crate) ring: RingPool,
    pub(crate) target: Option<FileTarget>,
    pub(crate) stopping: bool,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) stored: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) suppressed: AtomicU64,
    pub(crate) diagnostics: AtomicU64,
    pub(crate) cells_persisted: AtomicU64,
    pub(crate) bytes_persisted: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

/// Point-in-time view of the ring and its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingStats {
    pub cells: usize,
    pub sealed_cells: usize,
    pub buffered_bytes: usize,
    pub memory_bytes: usize,
    pub lines_stored: u64,
    pub lines_dropped: u64,
    pub lines_suppressed: u64,
    pub diagnostics: u64,
    pub cells_persisted: u64,
    pub bytes_persisted: u64,
}

impl Shared {
    pub(crate) fn now(&self) -> Timestamp {
        self.time.now()
    }

    pub(crate) fn current_date_at(&self, now: Timestamp) -> CivilDate {
        with_clock(self.config.zone, now, |clock, _| clock.date())
    }

    pub(crate) fn current_date(&self) -> CivilDate {
        self.current_date_at(self.time.now())
    }

    pub(crate) fn report(&self, diagnostic: &Diagnostic) {
        Counters::bump(&self.counters.diagnostics, 1);
        diagnostics::emit(diagnostic);
    }
}

impl RingLog {
    /// Creates a logger backed by the system clock. No files are touched
    /// until [`configure`](Self::configure) is called; lines submitted before
    /// that are buffered.
    pub fn new(config: RingLogConfig) -> Result<Self> {
        Self::with_time_source(config, Arc::new(SystemClock))
    }

    pub fn with_time_source(config: RingLogConfig, time: Arc<dyn TimeSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, time))
    }

    /// Creates, configures and starts a logger from one config.
    pub fn open(config: RingLogConfig) -> Result<(Self, WorkerHandle)> {
        let directory = config.directory.clone();
        let program = config.program_name.clone();
        let level = config.min_level;
        let logger = Self::new(config)?;
        logger.configure(&directory, &program, level)?;
        let worker = logger.start()?;
        Ok((logger, worker))
    }

    pub(crate) fn build(config: RingLogConfig, time: Arc<dyn TimeSource>) -> Self {
        let ring = RingPool::new(
            config.cell_capacity,
            config.initial_cells,
            config.memory_ceiling,
        );
        let level = config.min_level;
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RingState {
                    ring,
                    target: None,
                    stopping: false,
                }),
                wakeup: Condvar::new(),
                config,
                counters: Counters::default(),
                worker_started: AtomicBool::new(false),
                level: AtomicU8::new(level.as_raw()),
                configured: AtomicBool::new(false),
                suppressed_at: AtomicU64::new(0),
                bridged: AtomicBool::new(false),
                time,
            }),
        }
    }

    /// One-time setup of the output location and minimum level.
    ///
    /// Creates `directory` if it doesn't exist. Until this succeeds the
    /// worker leaves buffered cells alone. Use
    /// [`LogLevel::from_raw_clamped`] to map an untrusted integer level.
    pub fn configure(
        &self,
        directory: impl AsRef<Path>,
        program_name: &str,
        level: LogLevel,
    ) -> Result<()> {
        validate_program_name(program_name)?;
        let directory = directory.as_ref();

        if self.shared.state.lock().target.is_some() {
            return Err(RingLogError::AlreadyConfigured);
        }
        fs::create_dir_all(directory).map_err(|e| RingLogError::io(directory, e))?;

        let mut state = self.shared.state.lock();
        if state.target.is_some() {
            return Err(RingLogError::AlreadyConfigured);
        }
        state.target = Some(FileTarget::new(directory, program_name));
        drop(state);

        self.set_level(level);
        self.shared.configured.store(true, Ordering::Release);
        tracing::info!(
            directory = %directory.display(),
            program = program_name,
            min_level = %level,
            "ring log configured"
        );
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.shared.configured.load(Ordering::Acquire)
    }

    pub fn current_level(&self) -> LogLevel {
        LogLevel::from_raw_clamped(self.shared.level.load(Ordering::Relaxed) as i64)
    }

    /// Changes the minimum level. When this logger backs the `log` crate the
    /// facade's max level follows, so bridged records aren't cut off early.
    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level.as_raw(), Ordering::Relaxed);
        if self.shared.bridged.load(Ordering::Acquire) {
            log::set_max_level(level.to_log_filter());
        }
    }

    /// Records that this logger now backs the `log` crate and syncs the
    /// facade's max level with the current minimum.
    pub(crate) fn mark_bridged(&self) {
        self.shared.bridged.store(true, Ordering::Release);
        log::set_max_level(self.current_level().to_log_filter());
    }

    /// Whether a line at `level` would be kept. Checked before formatting.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.passes(self.current_level())
    }

    pub fn config(&self) -> &RingLogConfig {
        &self.shared.config
    }

    /// Whether a drop happened less than a throttle window ago.
    pub fn is_throttled(&self) -> bool {
        self.throttled_at(self.shared.now())
    }

    fn throttled_at(&self, now: Timestamp) -> bool {
        let at = self.shared.suppressed_at.load(Ordering::Relaxed);
        at != 0
            && now.as_micros().saturating_sub(at)
                < self.shared.config.throttle_window.as_micros() as u64
    }

    fn admit(&self, level: LogLevel, now: Timestamp) -> bool {
        if level != LogLevel::Fatal && self.throttled_at(now) {
            Counters::bump(&self.shared.counters.suppressed, 1);
            return false;
        }
        true
    }

    /// Formats and appends one line. Filtered levels cost one atomic load.
    pub fn log(&self, level: LogLevel, location: &Location, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let now = self.shared.now();
        if !self.admit(level, now) {
            return;
        }

        LINE.with(|line| match line.try_borrow_mut() {
            Ok(mut buf) => self.render_and_append(&mut buf, level, now, location, args),
            // a Display impl that logs re-enters here
            Err(_) => self.render_and_append(&mut String::new(), level, now, location, args),
        });
    }

    fn render_and_append(
        &self,
        buf: &mut String,
        level: LogLevel,
        now: Timestamp,
        location: &Location,
        args: fmt::Arguments<'_>,
    ) {
        let mut stamp = [b'0'; STAMP_LEN];
        let (millis, date) = with_clock(self.shared.config.zone, now, |clock, millis| {
            stamp.copy_from_slice(clock.text().as_bytes());
            (millis, clock.date())
        });
        let stamp = std::str::from_utf8(&stamp).unwrap_or_default();
        render_line(
            buf,
            level,
            stamp,
            millis,
            location,
            args,
            self.shared.config.max_line_len,
        );
        self.append(buf.as_bytes(), now, date);
    }

    /// Appends an already rendered line. Never blocks on I/O and never
    /// reports failure: a line that can't be stored is counted, reported on
    /// the error stream and dropped.
    pub fn submit(&self, level: LogLevel, line: &[u8]) {
        let now = self.shared.now();
        if !self.admit(level, now) {
            return;
        }
        let date = self.shared.current_date_at(now);
        self.append(line, now, date);
    }

    fn append(&self, line: &[u8], now: Timestamp, date: CivilDate) {
        let shared = &*self.shared;
        let (outcome, cells) = {
            let mut state = shared.state.lock();
            let outcome = state.ring.append(line, date);
            (outcome, state.ring.cell_count())
        };

        if outcome.sealed_cell() {
            shared.wakeup.notify_one();
        }

        match outcome {
            AppendOutcome::Stored | AppendOutcome::Advanced | AppendOutcome::Grew => {
                Counters::bump(&shared.counters.stored, 1);
            }
            AppendOutcome::Saturated => {
                self.enter_throttle(now);
                shared.report(&Diagnostic::Saturated {
                    cells,
                    ceiling: shared.config.memory_ceiling,
                });
            }
            AppendOutcome::Lapped => {
                self.enter_throttle(now);
                shared.report(&Diagnostic::Lapped);
            }
            AppendOutcome::Oversized => {
                Counters::bump(&shared.counters.dropped, 1);
                shared.report(&Diagnostic::Oversized {
                    len: line.len(),
                    capacity: shared.config.cell_capacity,
                });
            }
        }
    }

    fn enter_throttle(&self, now: Timestamp) {
        Counters::bump(&self.shared.counters.dropped, 1);
        self.shared
            .suppressed_at
            .store(now.as_micros().max(1), Ordering::Relaxed);
    }

    /// Starts the persistence worker. Only one may run at a time.
    pub fn start(&self) -> Result<WorkerHandle> {
        if self.shared.worker_started.swap(true, Ordering::AcqRel) {
            return Err(RingLogError::WorkerAlreadyStarted);
        }
        WorkerHandle::spawn(Arc::clone(&self.shared)).map_err(|err| {
            self.shared.worker_started.store(false, Ordering::Release);
            err
        })
    }

    /// Wakes the worker without waiting for a cell to fill.
    pub fn notify_worker(&self) {
        self.shared.wakeup.notify_one();
    }

    pub fn stats(&self) -> RingStats {
        let counters = &self.shared.counters;
        let state = self.shared.state.lock();
        RingStats {
            cells: state.ring.cell_count(),
            sealed_cells: state.ring.sealed_count(),
            buffered_bytes: state.ring.buffered_bytes(),
            memory_bytes: state.ring.memory_bytes(),
            lines_stored: counters.stored.load(Ordering::Relaxed),
            lines_dropped: counters.dropped.load(Ordering::Relaxed),
            lines_suppressed: counters.suppressed.load(Ordering::Relaxed),
            diagnostics: counters.diagnostics.load(Ordering::Relaxed),
            cells_persisted: counters.cells_persisted.load(Ordering::Relaxed),
            bytes_persisted: counters.bytes_persisted.load(Ordering::Relaxed),
        }
    }

    /// Runs `f` against the ring under the lock. Meant for inspection.
    pub fn with_ring<R>(&self, f: impl FnOnce(&RingPool) -> R) -> R {
        let state = self.shared.state.lock();
        f(&state.ring)
    }
}

impl fmt::Debug for RingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingLog")
            .field("level", &self.current_level())
            .field("configured", &self.is_configured())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Timestamp};

    fn small_config() -> RingLogConfig {
        RingLogConfig {
            cell_capacity: 64,
            initial_cells: 3,
            memory_ceiling: 192,
            max_line_len: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_level_filter() {
        let logger = RingLog::new(small_config()).unwrap();
        assert_eq!(logger.current_level(), LogLevel::Info);
        assert!(logger.enabled(LogLevel::Warn));
        assert!(!logger.enabled(LogLevel::Debug));
        logger.set_level(LogLevel::Fatal);
        assert!(logger.enabled(LogLevel::Fatal));
        assert!(!logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_submit_before_configure_is_buffered() {
        let logger = RingLog::new(small_config()).unwrap();
        assert!(!logger.is_configured());
        logger.submit(LogLevel::Info, b"early line\n");
        let stats = logger.stats();
        assert_eq!(stats.lines_stored, 1);
        assert_eq!(stats.buffered_bytes, 11);
    }

    #[test]
    fn test_fatal_bypasses_throttle_window() {
        let clock = Arc::new(ManualClock::new(Timestamp::new(1_700_000_000, 0)));
        let logger = RingLog::with_time_source(small_config(), clock.clone()).unwrap();
        let line = [b'x'; 50];
        for _ in 0..4 {
            logger.submit(LogLevel::Info, &line);
        }
        assert!(logger.is_throttled());

        logger.submit(LogLevel::Info, &line);
        assert_eq!(logger.stats().lines_suppressed, 1);

        // evaluated, but the ring is still lapped so it is dropped
        logger.submit(LogLevel::Fatal, &line);
        let stats = logger.stats();
        assert_eq!(stats.lines_suppressed, 1);
        assert_eq!(stats.lines_dropped, 2);
    }

    #[test]
    fn test_loggers_on_one_thread_keep_their_own_time() {
        const HERE: Location = Location::new("f.rs", 1, "f");
        let config = |zone: ClockZone| RingLogConfig {
            cell_capacity: 128,
            memory_ceiling: 384,
            max_line_len: 128,
            zone,
            ..Default::default()
        };
        let utc_clock = Arc::new(ManualClock::new(Timestamp::new(1_700_000_000, 0)));
        let local_clock = Arc::new(ManualClock::new(Timestamp::new(1_700_086_400, 500_000)));
        let utc = RingLog::with_time_source(config(ClockZone::Utc), utc_clock).unwrap();
        let local = RingLog::with_time_source(config(ClockZone::Local), local_clock).unwrap();

        utc.log(LogLevel::Info, &HERE, format_args!("a"));
        local.log(LogLevel::Info, &HERE, format_args!("b"));
        utc.log(LogLevel::Info, &HERE, format_args!("c"));

        let text = |logger: &RingLog| {
            logger.with_ring(|ring| String::from_utf8(ring.cell(0).contents().to_vec()).unwrap())
        };
        let utc_text = text(&utc);
        let lines: Vec<_> = utc_text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(line.starts_with("[INFO][2023-11-14 22:13:20.000]"), "{}", line);
        }

        let expected = ClockCache::new(ClockZone::Local, Timestamp::new(1_700_086_400, 0));
        let local_text = text(&local);
        assert!(
            local_text.starts_with(&format!("[INFO][{}.500]", expected.text())),
            "{}",
            local_text
        );
    }

    #[test]
    fn test_configure_twice_rejected() {
        let dir = std::env::temp_dir().join(format!("ring_log_unit_{}", std::process::id()));
        let logger = RingLog::new(small_config()).unwrap();
        logger.configure(&dir, "unit", LogLevel::Debug).unwrap();
        assert_eq!(logger.current_level(), LogLevel::Debug);
        assert!(matches!(
            logger.configure(&dir, "unit", LogLevel::Info),
            Err(RingLogError::AlreadyConfigured)
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
