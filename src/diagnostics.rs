//! Out-of-band reporting for non-fatal failures.
//!
//! The logger can't log its own trouble into the ring that is in trouble, so
//! every diagnostic goes to the process error stream and is mirrored as a
//! `tracing` event for hosts that collect those.

use std::fmt;

use tracing::{error, warn};

use crate::error::RingLogError;

#[derive(Debug)]
pub enum Diagnostic {
    /// Ring at its memory ceiling with every cell sealed.
    Saturated { cells: usize, ceiling: usize },
    /// The write cursor caught up with a cell still being drained.
    Lapped,
    /// A line that could never fit in a cell.
    Oversized { len: usize, capacity: usize },
    /// File resolution or persistence failed.
    Persist(RingLogError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Saturated { cells, ceiling } => write!(
                f,
                "no more log space can be used ({} cells, ceiling {} bytes); dropping lines",
                cells, ceiling
            ),
            Diagnostic::Lapped => {
                f.write_str("write cursor reached the cell being drained; dropping lines")
            }
            Diagnostic::Oversized { len, capacity } => write!(
                f,
                "line of {} bytes exceeds cell capacity {}; dropped",
                len, capacity
            ),
            Diagnostic::Persist(err) => write!(f, "{}", err),
        }
    }
}

pub fn emit(diagnostic: &Diagnostic) {
    eprintln!("ring_log: {}", diagnostic);
    match diagnostic {
        Diagnostic::Persist(err) => error!(error = %err, "log persistence failed"),
        other => warn!(diagnostic = %other, "log line dropped"),
    }
}
