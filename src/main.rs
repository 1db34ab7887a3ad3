use std::env;
use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use ring_log::{log_info, LogLevel};
use tracing_subscriber::EnvFilter;

/// Hammers the process-wide logger from several threads and reports the
/// throughput.
///
/// Usage: `ring_log [dir] [threads] [lines_per_thread]`
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let dir = args.next().unwrap_or_else(|| "logs".to_string());
    let threads = args
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(4);
    let lines = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1_000_000);

    let worker = match ring_log::init(&dir, "ring_log", LogLevel::Trace) {
        Ok(worker) => worker,
        Err(err) => {
            eprintln!("failed to start logger: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let producers: Vec<_> = (0..threads)
        .map(|_| {
            thread::spawn(move || {
                for i in 0..lines {
                    log_info!(ring_log::global(), "test line {}", i);
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.join().is_err() {
            eprintln!("producer thread panicked");
        }
    }
    let produced = start.elapsed();

    worker.shutdown();
    let total = start.elapsed();

    let stats = ring_log::global().stats();
    println!(
        "{} threads x {} lines: produced in {:?}, persisted in {:?}",
        threads, lines, produced, total
    );
    println!(
        "stored {} dropped {} suppressed {} cells {} ({} MB reserved)",
        stats.lines_stored,
        stats.lines_dropped,
        stats.lines_suppressed,
        stats.cells,
        stats.memory_bytes / (1024 * 1024)
    );
    println!(
        "throughput: {:.2} million lines/sec",
        (threads as u64 * lines) as f64 / produced.as_secs_f64() / 1_000_000.0
    );
    ExitCode::SUCCESS
}
