use std::io::{self, Write};

use crate::clock::CivilDate;
use crate::error::RingLogError;

/// Whether a cell still takes appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    /// Producers may append; the drain side leaves it alone.
    Accepting,
    /// Closed to appends; waiting for (or undergoing) persistence.
    Sealed,
}

/// A fixed-capacity, append-only byte region.
///
/// The storage is reserved once at construction and never reallocated, so
/// an append is a bounded memory copy. An append that would not fit is a
/// no-op: it never writes part of a line. Callers check
/// [`remaining`](CellBuffer::remaining) first and route the line elsewhere.
#[derive(Debug)]
pub struct CellBuffer {
    capacity: usize,
    data: Vec<u8>,
    status: CellStatus,
    date: Option<CivilDate>,
}

impl CellBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: Vec::with_capacity(capacity),
            status: CellStatus::Accepting,
            date: None,
        }
    }

    /// A storage-less stand-in occupying a slot while the real cell is out
    /// being persisted. It reads as sealed, so producers never touch it.
    pub(crate) fn placeholder(capacity: usize) -> Self {
        Self {
            capacity,
            data: Vec::new(),
            status: CellStatus::Sealed,
            date: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn status(&self) -> CellStatus {
        self.status
    }

    pub fn is_accepting(&self) -> bool {
        self.status == CellStatus::Accepting
    }

    pub fn seal(&mut self) {
        self.status = CellStatus::Sealed;
    }

    /// Calendar day of the first line appended since the last clear.
    pub fn date(&self) -> Option<CivilDate> {
        self.date
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Copies `bytes` onto the tail. Does nothing at all if they don't fit.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.remaining() < bytes.len() {
            return;
        }
        self.data.extend_from_slice(bytes);
    }

    pub(crate) fn append_dated(&mut self, bytes: &[u8], date: CivilDate) {
        if self.remaining() < bytes.len() {
            return;
        }
        if self.data.is_empty() {
            self.date = Some(date);
        }
        self.data.extend_from_slice(bytes);
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.status = CellStatus::Accepting;
        self.date = None;
    }

    /// Writes the used bytes to `sink` in one pass.
    ///
    /// A sink that stops accepting bytes part way is not retried: the short
    /// count comes back as [`RingLogError::PartialWrite`] and the caller moves
    /// on to the next cell.
    pub fn persist<W: Write>(&self, sink: &mut W) -> Result<usize, RingLogError> {
        let expected = self.data.len();
        let mut written = 0;
        while written < expected {
            match sink.write(&self.data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        if written != expected {
            return Err(RingLogError::PartialWrite { written, expected });
        }
        Ok(written)
    }
}
