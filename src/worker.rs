//! The single background thread that moves sealed cells to disk.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::diagnostics::Diagnostic;
use crate::error::{Result, RingLogError};
use crate::logger::{Counters, Shared};
use crate::rotation::RotationPolicy;

/// Owner of the persistence thread.
///
/// Dropping the handle (or calling [`shutdown`](WorkerHandle::shutdown))
/// seals the partially filled tail cell, drains every sealed cell, flushes
/// and joins the thread. Lines still buffered when the process exits without
/// this are lost.
pub struct WorkerHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Result<Self> {
        let policy = RotationPolicy::new(shared.config.file_size_ceiling);
        let worker_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("ring-log-persist".to_string())
            .spawn(move || run(&worker_shared, policy))
            .map_err(RingLogError::WorkerSpawn)?;
        info!("persistence worker started");
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Flushes everything buffered and stops the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(false, |thread| !thread.is_finished())
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.shared.state.lock().stopping = true;
        self.shared.wakeup.notify_all();
        if thread.join().is_err() {
            error!("persistence worker panicked");
        }

        self.shared.state.lock().stopping = false;
        self.shared.worker_started.store(false, Ordering::Release);
        info!("persistence worker stopped");
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain loop. Runs until a stop is requested and nothing is left to write.
fn run(shared: &Shared, mut policy: RotationPolicy) {
    let interval = shared.config.drain_interval;

    loop {
        let mut state = shared.state.lock();
        if state.ring.drain_cell().is_accepting() && !state.stopping {
            shared.wakeup.wait_for(&mut state, interval);
        }

        if state.ring.drain_cell().is_empty() {
            if !state.ring.drain_cell().is_accepting() {
                // sealed with nothing in it: recycle without a write
                state.ring.skip_drain();
                continue;
            }
            if state.stopping {
                break;
            }
            continue;
        }

        let Some(target) = state.target.clone() else {
            if state.stopping {
                let lost = state.ring.buffered_bytes();
                drop(state);
                shared.report(&Diagnostic::Persist(RingLogError::NotConfigured));
                debug!(lost_bytes = lost, "worker stopped before configuration");
                break;
            }
            // nothing may touch the file system yet
            shared.wakeup.wait_for(&mut state, interval);
            continue;
        };

        state.ring.seal_tail();
        let cell = state.ring.take_drain();
        drop(state);

        let date = cell.date().unwrap_or_else(|| shared.current_date());
        let persisted = policy.ensure(&target, date);
        if persisted {
            match policy.write_cell(&cell) {
                Ok(written) => {
                    Counters::bump(&shared.counters.cells_persisted, 1);
                    Counters::bump(&shared.counters.bytes_persisted, written as u64);
                }
                Err(err) => {
                    if let RingLogError::PartialWrite { written, .. } = &err {
                        Counters::bump(&shared.counters.bytes_persisted, *written as u64);
                    }
                    shared.report(&Diagnostic::Persist(err));
                }
            }
        }

        let mut state = shared.state.lock();
        if persisted {
            state.ring.finish_drain(cell);
            continue;
        }

        // keep the data for the next round
        state.ring.restore_drain(cell);
        if state.stopping {
            let lost = state.ring.drain_cell().len();
            state.ring.skip_drain();
            drop(state);
            error!(lost_bytes = lost, "discarding cell at shutdown, no writable file");
            continue;
        }
        shared.wakeup.wait_for(&mut state, interval);
    }
}
