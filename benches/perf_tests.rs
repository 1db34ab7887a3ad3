use criterion::{black_box, criterion_group, criterion_main, Criterion};
use log::{info, LevelFilter};
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use ring_log::{log_info, LogLevel, RingLog, RingLogConfig};
use std::sync::Once;
use std::time::Instant;
use tempfile::tempdir;

const CELL_SIZE: usize = 4 * 1024 * 1024; // 4MB cells
const NUM_CELL_FILLS: usize = 4;
const RECORD_SIZE_ESTIMATE: usize = 256;
const ITERATIONS: usize = (CELL_SIZE * NUM_CELL_FILLS) / RECORD_SIZE_ESTIMATE;

static LOGGER_INIT: Once = Once::new();

#[derive(Debug)]
struct TestEvent {
    id: i32,
    active: bool,
    large_number: u64,
    description: String,
}

impl std::fmt::Display for TestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event[id={}, active={}, large_number={}, desc={}]",
            self.id, self.active, self.large_number, self.description
        )
    }
}

fn setup_log4rs(log_file: &str) {
    LOGGER_INIT.call_once(|| {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {m}{n}")))
            .append(true)
            .build(log_file)
            .unwrap();

        let config = Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Info))
            .unwrap();

        log4rs::init_config(config).unwrap();
    });
}

fn bench_logging_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Logging Comparison");
    group.sample_size(10);

    group.bench_function("ring_vs_log4rs", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let event = TestEvent {
                id: 42,
                active: true,
                large_number: u64::MAX,
                description: "CPU: 95%, Memory: 2.5GB, Network: 1.2Gbps".to_string(),
            };

            let config = RingLogConfig {
                directory: dir.path().join("ring"),
                program_name: "bench".to_string(),
                min_level: LogLevel::Info,
                cell_capacity: CELL_SIZE,
                memory_ceiling: CELL_SIZE * 16,
                ..Default::default()
            };
            let (logger, worker) = RingLog::open(config).unwrap();

            let ring_start = Instant::now();
            for i in 0..ITERATIONS {
                log_info!(logger, "Test perf: iteration={}, event={}", i, event);
            }
            let ring_duration = ring_start.elapsed();
            worker.shutdown();

            let traditional_log_file = dir.path().join("traditional.log");
            setup_log4rs(traditional_log_file.to_str().unwrap());

            let traditional_start = Instant::now();
            for i in 0..ITERATIONS {
                info!("Test perf: iteration={}, event={}", i, event);
            }
            let traditional_duration = traditional_start.elapsed();

            println!("\nPerformance comparison ({} iterations):", ITERATIONS);
            println!("Ring logging (producer side): {:?}", ring_duration);
            println!("log4rs (with I/O): {:?}", traditional_duration);
            println!(
                "Speedup: {:.2}x",
                traditional_duration.as_secs_f64() / ring_duration.as_secs_f64()
            );

            black_box((ring_duration, traditional_duration))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_logging_comparison);
criterion_main!(benches);
