//! Run-level statistics aggregation
//!
//! Combines per-worker statistics into the final view of a run once every
//! worker has joined. Per-worker statistics are preserved for the verbose
//! report; per-device accumulators are merged across workers.

use crate::stats::{LatencyStats, WorkerStats};
use std::time::Duration;

/// Aggregated results of a complete run.
///
/// Built by the coordinator after all workers have joined. Throughput is
/// derived from the wall-clock span between run start and the last join,
/// not from accumulated I/O time.
#[derive(Debug)]
pub struct RunStats {
    /// Wall-clock span from before the first spawn to after the last join
    wall: Duration,

    /// Per-worker statistics, indexed by worker id
    workers: Vec<WorkerStats>,

    /// Per-device statistics merged across all workers
    devices: Vec<LatencyStats>,

    /// All operations of the run
    total: LatencyStats,
}

impl RunStats {
    /// Merge joined worker statistics into a run aggregate.
    ///
    /// `device_count` must match the device count the workers were created
    /// with.
    pub fn from_workers(workers: Vec<WorkerStats>, device_count: usize, wall: Duration) -> Self {
        let mut devices = vec![LatencyStats::new(); device_count];
        let mut total = LatencyStats::new();

        for worker in &workers {
            total.merge(worker.io());
            for (dev, stats) in worker.per_device().iter().enumerate() {
                devices[dev].merge(stats);
            }
        }

        Self {
            wall,
            workers,
            devices,
            total,
        }
    }

    /// Wall-clock span of the run
    pub fn wall(&self) -> Duration {
        self.wall
    }

    /// Per-worker statistics
    pub fn workers(&self) -> &[WorkerStats] {
        &self.workers
    }

    /// Per-device statistics merged across workers
    pub fn devices(&self) -> &[LatencyStats] {
        &self.devices
    }

    /// Aggregate over every operation of the run
    pub fn total(&self) -> &LatencyStats {
        &self.total
    }

    /// Total number of completed operations
    pub fn total_ops(&self) -> u64 {
        self.total.count()
    }

    /// Operations per second over the wall-clock span
    pub fn throughput_ops(&self) -> f64 {
        crate::util::time::calculate_rate(self.total.count(), self.wall)
    }

    /// Bytes per second over the wall-clock span
    pub fn throughput_bytes(&self, block_size: usize) -> f64 {
        crate::util::time::calculate_throughput(self.total.count() * block_size as u64, self.wall)
    }

    /// Largest single-operation latency across all workers
    pub fn max_latency(&self) -> Duration {
        self.total.max()
    }

    /// Mean latency across all operations
    pub fn avg_latency(&self) -> Duration {
        self.total.mean()
    }
}
