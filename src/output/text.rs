//! Human-readable text output
//!
//! Configuration banner and result report, printed to stdout. Throughput is
//! reported in blocks/s plus both decimal (MB/s) and binary (MiB/s) units;
//! response times in ms per block. The per-thread and per-device sections
//! appear at verbosity 2 and above.

use crate::config::{AccessPattern, Config, Direction};
use crate::stats::aggregator::RunStats;
use crate::stats::{LatencyStats, WorkerStats};
use crate::util::time::{as_millis_f64, calculate_rate, calculate_throughput};
use std::time::Duration;

const MEGA: f64 = 1_000_000.0;
const MEBI: f64 = 1_048_576.0;

fn banner(title: &str) {
    println!("************************************************************");
    println!("  ioprobe - {}", title);
    println!("************************************************************");
}

/// Print the resolved configuration (verbosity >= 1).
pub fn print_config(config: &Config) {
    banner("Configuration");

    println!("  Device(s)            : {}", config.devices.len());
    for path in &config.devices {
        println!("                         {}", path.display());
    }
    println!(
        "  Access pattern       : {} {}",
        match config.pattern {
            AccessPattern::Random => "Fully random",
            AccessPattern::Sequential => "Fully sequential",
        },
        match config.direction {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    );
    println!(
        "  IO mode option       : {}{}",
        if config.direct { "O_DIRECT " } else { "" },
        if config.sync { "O_SYNC " } else { "" }
    );
    println!(
        "  Multiplexing         : {} (multiplex degree: {})",
        if config.threads > 1 { "Yes" } else { "No" },
        config.threads
    );
    println!(
        "  Async I/O            : {} (concurrency per thread: {})",
        if config.is_async() { "Yes" } else { "No" },
        config.concurrency
    );
    println!("  Block size           : {:7} [Byte]", config.block_size);

    let block_size = config.block_size as u64;
    println!(
        "  Access region        : {:12} - {:12} ({:12}) [block]",
        config.start_block,
        config.end_block,
        config.block_count()
    );
    println!(
        "                       : {:12.1} - {:12.1} ({:12.1}) [MB]",
        (config.start_block * block_size) as f64 / MEGA,
        (config.end_block * block_size) as f64 / MEGA,
        (config.block_count() * block_size) as f64 / MEGA
    );
    println!(
        "                       : {:12.1} - {:12.1} ({:12.1}) [MiB]",
        (config.start_block * block_size) as f64 / MEBI,
        (config.end_block * block_size) as f64 / MEBI,
        (config.block_count() * block_size) as f64 / MEBI
    );
    println!(
        "  Number of I/Os       : {:12} [block] {:12} [block/thread]",
        config.total_ops(),
        config.ops_per_thread
    );
    println!(
        "                       : {:12.1} [MB]    {:12.1} [MB/thread]",
        (config.total_ops() * block_size) as f64 / MEGA,
        (config.ops_per_thread * block_size) as f64 / MEGA
    );
}

/// Print the result of a completed run.
pub fn print_report(config: &Config, run: &RunStats) {
    banner("Global result");

    println!("  Exec. time           : {:9.3} [s]", run.wall().as_secs_f64());
    println!(
        "  Total throughput     : {:9.3} [block/s]",
        run.throughput_ops()
    );
    println!(
        "                       : {:9.3} [MB/s]",
        run.throughput_bytes(config.block_size) / MEGA
    );
    println!(
        "                       : {:9.3} [MiB/s]",
        run.throughput_bytes(config.block_size) / MEBI
    );
    println!(
        "  Avg. Resp. time      : {:9.3} [ms/block]",
        as_millis_f64(run.avg_latency())
    );
    println!(
        "  Max. Resp. time      : {:9.3} [ms/block]",
        as_millis_f64(run.max_latency())
    );
    println!(
        "  Accm. I/O time       : {:9.3} [s]",
        run.total().sum().as_secs_f64()
    );

    if config.verbosity >= 2 {
        banner("Worker result(s)");
        for (id, worker) in run.workers().iter().enumerate() {
            print_worker_result(id, worker, config.block_size);
        }

        banner("Device result(s)");
        for (id, device) in run.devices().iter().enumerate() {
            print_device_result(id, device, config.block_size, run.wall());
        }
    }
}

fn print_worker_result(id: usize, worker: &WorkerStats, block_size: usize) {
    let stats = worker.io();
    println!(
        "  [{:02}] Exec. time      : {:9.3} [s]",
        id,
        worker.span().as_secs_f64()
    );
    println!(
        "       Throughput      : {:9.3} [block/s]",
        calculate_rate(stats.count(), worker.span())
    );
    println!(
        "                       : {:9.3} [MB/s]",
        calculate_throughput(stats.count() * block_size as u64, worker.span()) / MEGA
    );
    println!(
        "       Avg. Resp. time : {:9.3} [ms/block]",
        as_millis_f64(stats.mean())
    );
    println!(
        "       Max. Resp. time : {:9.3} [ms/block]",
        as_millis_f64(stats.max())
    );
    println!(
        "       Accm. I/O time  : {:9.3} [s]",
        stats.sum().as_secs_f64()
    );
}

fn print_device_result(id: usize, stats: &LatencyStats, block_size: usize, wall: Duration) {
    println!(
        "  [{:02}] Throughput      : {:9.3} [block/s]",
        id,
        calculate_rate(stats.count(), wall)
    );
    println!(
        "                       : {:9.3} [MB/s]",
        calculate_throughput(stats.count() * block_size as u64, wall) / MEGA
    );
    println!(
        "       Avg. Resp. time : {:9.3} [ms/block]",
        as_millis_f64(stats.mean())
    );
    println!(
        "       Max. Resp. time : {:9.3} [ms/block]",
        as_millis_f64(stats.max())
    );
    println!(
        "       Accm. I/O time  : {:9.3} [s]",
        stats.sum().as_secs_f64()
    );
}
