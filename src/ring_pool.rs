//! The circular pool of cells shared by producers and the drain worker.
//!
//! Cells live in an arena (`cells`) and the cycle is threaded through a
//! parallel table of successor indices (`links`). Growing the ring pushes a
//! new cell onto the arena and splices it in after the write cursor, which is
//! O(1) and leaves every existing index valid.
//!
//! Cursor layout, walking the cycle from the drain cursor:
//!
//! ```text
//!   drain                 write
//!     v                     v
//!   [S] -> [S] -> [S] -> [A*] -> [A] -> [A] -> (back to drain)
//!   sealed, awaiting disk  filling  drained and recycled
//! ```
//!
//! The only other reachable shape is the lapped one, where every cell is
//! sealed and the write cursor sits on the drain cell. Producers drop lines
//! until the worker hands that cell back.

use std::mem;

use tracing::debug;

use crate::cell_buffer::{CellBuffer, CellStatus};
use crate::clock::CivilDate;

/// What happened to a line handed to [`RingPool::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored in the current write cell.
    Stored,
    /// The write cell was full: it was sealed and the line went into the
    /// next, already recycled cell.
    Advanced,
    /// The write cell was full and the next one was still sealed, so a fresh
    /// cell was spliced in after it to take the line.
    Grew,
    /// The write cell was full, the next one was still sealed and the memory
    /// ceiling forbids another cell. The write cursor moved on regardless and
    /// the line was lost.
    Saturated,
    /// The write cell itself is sealed: draining has fallen a full lap
    /// behind. The line was lost.
    Lapped,
    /// The line is longer than a whole cell and can never be stored.
    Oversized,
}

impl AppendOutcome {
    pub fn is_stored(self) -> bool {
        matches!(
            self,
            AppendOutcome::Stored | AppendOutcome::Advanced | AppendOutcome::Grew
        )
    }

    /// Whether this append sealed a cell, i.e. the drain side has new work.
    pub fn sealed_cell(self) -> bool {
        matches!(
            self,
            AppendOutcome::Advanced | AppendOutcome::Grew | AppendOutcome::Saturated
        )
    }
}

enum Advance {
    Recycled,
    Grew,
    Saturated,
}

pub struct RingPool {
    cells: Vec<CellBuffer>,
    links: Vec<usize>,
    write: usize,
    drain: usize,
    /// The drain cell is out with the worker and its slot holds a placeholder.
    lent: bool,
    cell_capacity: usize,
    memory_ceiling: usize,
}

impl RingPool {
    /// Builds a cycle of `initial_cells` empty cells with both cursors on the
    /// first. `initial_cells` must be at least one.
    pub fn new(cell_capacity: usize, initial_cells: usize, memory_ceiling: usize) -> Self {
        let count = initial_cells.max(1);
        let cells = (0..count).map(|_| CellBuffer::new(cell_capacity)).collect();
        let links = (0..count).map(|i| (i + 1) % count).collect();
        Self {
            cells,
            links,
            write: 0,
            drain: 0,
            lent: false,
            cell_capacity,
            memory_ceiling,
        }
    }

    /// Appends one complete line, sealing, recycling or growing as needed.
    pub fn append(&mut self, line: &[u8], date: CivilDate) -> AppendOutcome {
        if line.len() > self.cell_capacity {
            return AppendOutcome::Oversized;
        }

        let cell = &mut self.cells[self.write];
        if !cell.is_accepting() {
            return AppendOutcome::Lapped;
        }
        if cell.remaining() >= line.len() {
            cell.append_dated(line, date);
            return AppendOutcome::Stored;
        }

        cell.seal();
        let outcome = match self.advance_write() {
            Advance::Recycled => AppendOutcome::Advanced,
            Advance::Grew => AppendOutcome::Grew,
            Advance::Saturated => return AppendOutcome::Saturated,
        };
        self.cells[self.write].append_dated(line, date);
        outcome
    }

    /// Moves the write cursor off a cell that was just sealed.
    fn advance_write(&mut self) -> Advance {
        let next = self.links[self.write];
        if self.cells[next].is_accepting() {
            self.write = next;
            return Advance::Recycled;
        }

        if !self.can_grow() {
            self.write = next;
            return Advance::Saturated;
        }

        let fresh = self.cells.len();
        self.cells.push(CellBuffer::new(self.cell_capacity));
        self.links.push(next);
        self.links[self.write] = fresh;
        self.write = fresh;
        debug!(
            cells = self.cells.len(),
            bytes = self.memory_bytes(),
            "ring grew by one cell"
        );
        Advance::Grew
    }

    /// Whether one more cell still fits under the memory ceiling.
    pub fn can_grow(&self) -> bool {
        (self.cells.len() + 1)
            .checked_mul(self.cell_capacity)
            .map_or(false, |total| total <= self.memory_ceiling)
    }

    /// Seals a partially filled tail cell so the worker can persist it.
    ///
    /// Only applies when the write cursor sits on the drain cell and that
    /// cell is accepting and non-empty, i.e. producers went quiet before
    /// filling it. Returns whether anything was sealed.
    pub fn seal_tail(&mut self) -> bool {
        if self.write != self.drain {
            return false;
        }
        let cell = &mut self.cells[self.drain];
        if !cell.is_accepting() || cell.is_empty() {
            return false;
        }
        cell.seal();
        self.advance_write();
        true
    }

    pub fn drain_cell(&self) -> &CellBuffer {
        &self.cells[self.drain]
    }

    /// Moves the drain cell out of the ring for persistence, leaving a
    /// sealed placeholder in its slot.
    pub fn take_drain(&mut self) -> CellBuffer {
        let placeholder = CellBuffer::placeholder(self.cell_capacity);
        self.lent = true;
        mem::replace(&mut self.cells[self.drain], placeholder)
    }

    /// Returns a persisted cell to its slot, recycles it and moves the drain
    /// cursor on.
    pub fn finish_drain(&mut self, mut cell: CellBuffer) {
        cell.clear();
        self.cells[self.drain] = cell;
        self.lent = false;
        self.drain = self.links[self.drain];
    }

    /// Returns an unpersisted cell to its slot untouched, so the next round
    /// retries it.
    pub fn restore_drain(&mut self, cell: CellBuffer) {
        self.cells[self.drain] = cell;
        self.lent = false;
    }

    /// Recycles the drain cell in place without persisting it.
    pub fn skip_drain(&mut self) {
        self.cells[self.drain].clear();
        self.drain = self.links[self.drain];
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    pub fn drain_index(&self) -> usize {
        self.drain
    }

    pub fn next_of(&self, index: usize) -> usize {
        self.links[index]
    }

    pub fn cell(&self, index: usize) -> &CellBuffer {
        &self.cells[index]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_capacity(&self) -> usize {
        self.cell_capacity
    }

    pub fn memory_ceiling(&self) -> usize {
        self.memory_ceiling
    }

    /// Reserved bytes: cell count times per-cell capacity.
    pub fn memory_bytes(&self) -> usize {
        self.cells.len() * self.cell_capacity
    }

    /// Whether the drain cell is currently out being persisted.
    pub fn is_draining(&self) -> bool {
        self.lent
    }

    /// Sealed cells holding data; a slot whose cell is out being persisted
    /// is not counted.
    pub fn sealed_count(&self) -> usize {
        let sealed = self
            .cells
            .iter()
            .filter(|c| c.status() == CellStatus::Sealed)
            .count();
        sealed - usize::from(self.lent)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.cells.iter().map(CellBuffer::len).sum()
    }

    /// Cell indices in cycle order, starting from the drain cursor.
    pub fn ring_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.cells.len());
        let mut at = self.drain;
        for _ in 0..self.cells.len() {
            order.push(at);
            at = self.links[at];
        }
        order
    }
}
