use ring_log::{install_log_bridge, log_warn, LogLevel, RingLogError};
use std::env;
use std::fs;
use tempfile::tempdir;

// The shared instance is built once per process, so everything touching it
// lives in this one test.
#[test]
fn test_global_instance_with_log_bridge() {
    env::set_var("RING_LOG_CELL_BYTES", "65536");
    env::set_var("RING_LOG_MEMORY_LIMIT", "1048576");
    env::set_var("RING_LOG_DRAIN_MILLIS", "10");

    let dir = tempdir().unwrap();
    let worker = ring_log::init(dir.path(), "global", LogLevel::Info).unwrap();
    assert_eq!(ring_log::global().config().cell_capacity, 65536);
    assert!(matches!(
        ring_log::init(dir.path(), "global", LogLevel::Info),
        Err(RingLogError::AlreadyConfigured)
    ));

    install_log_bridge(ring_log::global()).unwrap();
    log::info!("through the log facade {}", 1);
    log::debug!("filtered by the max level");
    log_warn!(ring_log::global(), "through the macros {}", 2);
    worker.shutdown();

    let files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let contents = fs::read_to_string(&files[0]).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[INFO]"));
    assert!(lines[0].contains("(global_tests): through the log facade 1"));
    assert!(lines[1].starts_with("[WARN]"));
    assert!(lines[1].ends_with("through the macros 2"));
}
