//! Deciding which file a drained cell goes to.
//!
//! Active file: `<dir>/<program>.<YYYYMMDD>.<pid>.log`. When it reaches the
//! size ceiling it becomes `.log.1`, older siblings shift up by one and a
//! fresh unnumbered file takes over. A new calendar day starts a new
//! unnumbered file and resets the sibling count.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cell_buffer::CellBuffer;
use crate::clock::CivilDate;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{Result, RingLogError};

/// Where log files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub directory: PathBuf,
    pub program: String,
}

impl FileTarget {
    pub fn new(directory: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            program: program.into(),
        }
    }

    pub fn active_path(&self, date: CivilDate, pid: u32) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{}.log", self.program, date.compact(), pid))
    }

    pub fn rotated_path(&self, date: CivilDate, pid: u32, n: u32) -> PathBuf {
        self.directory.join(format!(
            "{}.{}.{}.log.{}",
            self.program,
            date.compact(),
            pid,
            n
        ))
    }
}

/// What [`RotationPolicy::resolve`] did to get a usable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Kept writing to the already open file.
    Unchanged,
    /// Opened the first file.
    Opened,
    /// Closed yesterday's file and opened today's.
    NewDay,
    /// Shifted the numbered siblings and reopened the unnumbered file.
    SizeRolled,
}

struct ActiveFile {
    file: File,
    path: PathBuf,
    target: FileTarget,
    date: CivilDate,
    size: u64,
}

/// Owned by the persistence worker; nothing else touches the file handle.
pub struct RotationPolicy {
    pid: u32,
    size_ceiling: u64,
    active: Option<ActiveFile>,
    rotations: u32,
}

impl RotationPolicy {
    pub fn new(size_ceiling: u64) -> Self {
        Self::with_pid(size_ceiling, std::process::id())
    }

    pub fn with_pid(size_ceiling: u64, pid: u32) -> Self {
        Self {
            pid,
            size_ceiling,
            active: None,
            rotations: 0,
        }
    }

    /// Makes sure a file suitable for `date` is open, rotating if needed.
    ///
    /// A failed open or rename leaves the previous handle (if any) in place
    /// and comes back as an error.
    pub fn resolve(&mut self, target: &FileTarget, date: CivilDate) -> Result<Rotation> {
        let Some(active) = self.active.as_ref() else {
            self.open_fresh(target, date)?;
            self.rotations = 1;
            return Ok(Rotation::Opened);
        };

        if active.target != *target {
            self.open_fresh(target, date)?;
            self.rotations = 1;
            return Ok(Rotation::Opened);
        }

        if active.date != date {
            self.open_fresh(target, date)?;
            self.rotations = 1;
            info!(date = %date.compact(), "log file rolled to a new day");
            return Ok(Rotation::NewDay);
        }

        if active.size >= self.size_ceiling {
            self.roll_by_size()?;
            return Ok(Rotation::SizeRolled);
        }

        Ok(Rotation::Unchanged)
    }

    /// [`resolve`](Self::resolve), reporting any failure on the error
    /// stream. Returns whether a file handle is available for writing.
    pub fn ensure(&mut self, target: &FileTarget, date: CivilDate) -> bool {
        if let Err(err) = self.resolve(target, date) {
            diagnostics::emit(&Diagnostic::Persist(err));
        }
        self.active.is_some()
    }

    /// Writes a cell's bytes to the open file and flushes it.
    pub fn write_cell(&mut self, cell: &CellBuffer) -> Result<usize> {
        let active = self.active.as_mut().ok_or(RingLogError::NotConfigured)?;
        let outcome = cell.persist(&mut active.file);
        let written = match &outcome {
            Ok(n) => *n,
            Err(RingLogError::PartialWrite { written, .. }) => *written,
            Err(_) => 0,
        };
        active.size += written as u64;
        active
            .file
            .flush()
            .map_err(|e| RingLogError::io(&active.path, e))?;
        outcome
    }

    /// Number of files produced for the current day, the active one included.
    pub fn rotation_count(&self) -> u32 {
        self.rotations
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    pub fn active_size(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.size)
    }

    pub fn size_ceiling(&self) -> u64 {
        self.size_ceiling
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn open_fresh(&mut self, target: &FileTarget, date: CivilDate) -> Result<()> {
        let path = target.active_path(date, self.pid);
        let (file, size) = open_append(&path)?;
        // the old handle, if any, closes on drop
        self.active = Some(ActiveFile {
            file,
            path,
            target: target.clone(),
            date,
            size,
        });
        Ok(())
    }

    fn roll_by_size(&mut self) -> Result<()> {
        self.roll_by_size_with(open_append)
    }

    /// Size roll with the reopen step supplied by the caller. If the reopen
    /// fails every rename is undone, so the next roll starts from the same
    /// sibling layout and the old handle keeps writing to the unnumbered file.
    fn roll_by_size_with(
        &mut self,
        mut reopen: impl FnMut(&Path) -> Result<(File, u64)>,
    ) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let target = active.target.clone();
        let date = active.date;
        let pid = self.pid;

        // highest first, so nothing is overwritten
        for n in (1..self.rotations).rev() {
            let from = target.rotated_path(date, pid, n);
            let to = target.rotated_path(date, pid, n + 1);
            rename_if_present(&from, &to)?;
        }

        let current = target.active_path(date, pid);
        let first = target.rotated_path(date, pid, 1);
        rename_if_present(&current, &first)?;

        let (file, size) = match reopen(&current) {
            Ok(opened) => opened,
            Err(err) => {
                let _ = rename_if_present(&first, &current);
                for n in 1..self.rotations {
                    let from = target.rotated_path(date, pid, n + 1);
                    let to = target.rotated_path(date, pid, n);
                    let _ = rename_if_present(&from, &to);
                }
                return Err(err);
            }
        };
        active.file = file;
        active.path = current;
        active.size = size;
        self.rotations += 1;
        info!(rotations = self.rotations, "log file rotated by size");
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RingLogError::io(path, e))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

fn rename_if_present(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RingLogError::io(from, e)),
    }
}
