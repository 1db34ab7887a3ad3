//! Turning a call site and its arguments into one line of text.
//!
//! Line layout:
//!
//! ```text
//! [INFO][2024-03-01 14:30:45.123][7]src/server.rs:42(server::accept): client connected
//! ```
//!
//! The bracketed number is a small per-thread sequence id.

use std::cell::Cell;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::level::LogLevel;

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

impl Location {
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self {
        Self {
            file,
            line,
            function,
        }
    }
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

/// Per-thread id, assigned on first use.
pub fn thread_id() -> u64 {
    THREAD_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}

/// Renders a complete line into `out`, which is cleared first.
///
/// The result always ends in a newline and is at most `max_len` bytes; an
/// over-long message is cut at a character boundary to make room for it.
pub fn render_line(
    out: &mut String,
    level: LogLevel,
    stamp: &str,
    millis: u32,
    location: &Location,
    args: fmt::Arguments<'_>,
    max_len: usize,
) {
    out.clear();
    // writing into a String can't fail
    let _ = write!(
        out,
        "{}[{}.{:03}][{}]{}:{}({}): ",
        level.tag(),
        stamp,
        millis,
        thread_id(),
        location.file,
        location.line,
        location.function
    );
    let _ = out.write_fmt(args);
    if out.ends_with('\n') {
        out.pop();
    }
    truncate_at_boundary(out, max_len.saturating_sub(1));
    out.push('\n');
}

fn truncate_at_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Strips the helper suffix off a `type_name` captured inside a nested fn,
/// leaving the path of the enclosing function.
#[doc(hidden)]
pub fn enclosing_function(raw: &'static str) -> &'static str {
    let name = raw.strip_suffix("::__ring_log_here").unwrap_or(raw);
    name.strip_suffix("::{{closure}}").unwrap_or(name)
}
