use std::fs;
use std::path::Path;

use ring_log::cell_buffer::CellBuffer;
use ring_log::clock::CivilDate;
use ring_log::rotation::{FileTarget, Rotation, RotationPolicy};
use ring_log::RingLogError;
use tempfile::tempdir;

const PID: u32 = 4242;
const DAY: CivilDate = CivilDate::new(2024, 3, 1);
const NEXT_DAY: CivilDate = CivilDate::new(2024, 3, 2);

fn filled_cell(byte: u8, len: usize) -> CellBuffer {
    let mut cell = CellBuffer::new(len);
    cell.append(&vec![byte; len]);
    cell.seal();
    cell
}

fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}

#[test]
fn test_first_resolve_opens_dated_file() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    let mut policy = RotationPolicy::with_pid(1024, PID);

    assert_eq!(policy.resolve(&target, DAY).unwrap(), Rotation::Opened);
    assert_eq!(policy.rotation_count(), 1);
    let expected = dir.path().join("svc.20240301.4242.log");
    assert_eq!(policy.active_path(), Some(expected.as_path()));
    assert!(expected.exists());

    assert_eq!(policy.resolve(&target, DAY).unwrap(), Rotation::Unchanged);
}

#[test]
fn test_write_cell_appends_and_tracks_size() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    let mut policy = RotationPolicy::with_pid(1024, PID);
    policy.resolve(&target, DAY).unwrap();

    assert_eq!(policy.write_cell(&filled_cell(b'a', 10)).unwrap(), 10);
    assert_eq!(policy.write_cell(&filled_cell(b'b', 5)).unwrap(), 5);
    assert_eq!(policy.active_size(), Some(15));
    assert_eq!(read(&target.active_path(DAY, PID)), b"aaaaaaaaaabbbbb");
}

#[test]
fn test_size_roll_shifts_siblings() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    let mut policy = RotationPolicy::with_pid(100, PID);

    policy.resolve(&target, DAY).unwrap();
    policy.write_cell(&filled_cell(b'1', 120)).unwrap();

    assert_eq!(policy.resolve(&target, DAY).unwrap(), Rotation::SizeRolled);
    assert_eq!(policy.rotation_count(), 2);
    assert_eq!(policy.active_size(), Some(0));
    policy.write_cell(&filled_cell(b'2', 120)).unwrap();

    assert_eq!(policy.resolve(&target, DAY).unwrap(), Rotation::SizeRolled);
    assert_eq!(policy.rotation_count(), 3);
    policy.write_cell(&filled_cell(b'3', 10)).unwrap();

    // oldest data has the highest number
    assert_eq!(read(&target.rotated_path(DAY, PID, 2)), vec![b'1'; 120]);
    assert_eq!(read(&target.rotated_path(DAY, PID, 1)), vec![b'2'; 120]);
    assert_eq!(read(&target.active_path(DAY, PID)), vec![b'3'; 10]);
    assert!(!target.rotated_path(DAY, PID, 3).exists());
}

#[test]
fn test_below_ceiling_never_rolls() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    let mut policy = RotationPolicy::with_pid(100, PID);
    policy.resolve(&target, DAY).unwrap();
    policy.write_cell(&filled_cell(b'x', 99)).unwrap();
    assert_eq!(policy.resolve(&target, DAY).unwrap(), Rotation::Unchanged);
    assert!(!target.rotated_path(DAY, PID, 1).exists());
}

#[test]
fn test_new_day_opens_unnumbered_file() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    let mut policy = RotationPolicy::with_pid(100, PID);

    policy.resolve(&target, DAY).unwrap();
    policy.write_cell(&filled_cell(b'a', 120)).unwrap();
    policy.resolve(&target, DAY).unwrap();
    assert_eq!(policy.rotation_count(), 2);

    assert_eq!(policy.resolve(&target, NEXT_DAY).unwrap(), Rotation::NewDay);
    assert_eq!(policy.rotation_count(), 1);
    assert_eq!(policy.active_size(), Some(0));
    let expected = dir.path().join("svc.20240302.4242.log");
    assert_eq!(policy.active_path(), Some(expected.as_path()));

    policy.write_cell(&filled_cell(b'n', 4)).unwrap();
    assert_eq!(read(&expected), b"nnnn");
    // yesterday's files are left as they were
    assert_eq!(read(&target.rotated_path(DAY, PID, 1)), vec![b'a'; 120]);
}

#[test]
fn test_reopen_picks_up_existing_size() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path(), "svc");
    fs::write(target.active_path(DAY, PID), vec![b'o'; 50]).unwrap();

    let mut policy = RotationPolicy::with_pid(1024, PID);
    policy.resolve(&target, DAY).unwrap();
    assert_eq!(policy.active_size(), Some(50));

    policy.write_cell(&filled_cell(b'p', 5)).unwrap();
    let contents = read(&target.active_path(DAY, PID));
    assert_eq!(contents.len(), 55);
    assert!(contents.starts_with(&[b'o'; 50]));
}

#[test]
fn test_failed_open_reports_and_keeps_nothing() {
    let dir = tempdir().unwrap();
    let target = FileTarget::new(dir.path().join("missing"), "svc");
    let mut policy = RotationPolicy::with_pid(1024, PID);

    assert!(matches!(
        policy.resolve(&target, DAY),
        Err(RingLogError::Io { .. })
    ));
    assert_eq!(policy.active_path(), None);
    assert!(!policy.ensure(&target, DAY));
}

#[test]
fn test_failed_open_keeps_previous_handle() {
    let dir = tempdir().unwrap();
    let good = FileTarget::new(dir.path(), "svc");
    let bad = FileTarget::new(dir.path().join("missing"), "svc");
    let mut policy = RotationPolicy::with_pid(1024, PID);
    policy.resolve(&good, DAY).unwrap();

    assert!(policy.resolve(&bad, DAY).is_err());
    let kept = good.active_path(DAY, PID);
    assert_eq!(policy.active_path(), Some(kept.as_path()));

    // still writable through the old handle
    assert!(policy.ensure(&bad, DAY));
    policy.write_cell(&filled_cell(b'k', 3)).unwrap();
    assert_eq!(read(&kept), b"kkk");
}
