//! Statistics collection
//!
//! Per-worker latency accumulators with per-device breakdowns. Each worker
//! thread records strictly into its own [`WorkerStats`] during the run; the
//! coordinator merges all workers after join, so no locks or atomics are
//! needed anywhere in the hot path.
//!
//! Only three quantities are tracked online per scope: accumulated latency,
//! maximum latency, and operation count. Averages and throughput are derived
//! once, after all workers have joined.
//!
//! # Example
//!
//! ```
//! use ioprobe::stats::WorkerStats;
//! use std::time::Duration;
//!
//! let mut stats = WorkerStats::new(2);
//! stats.record(0, Duration::from_micros(100));
//! stats.record(1, Duration::from_micros(250));
//!
//! assert_eq!(stats.io().count(), 2);
//! assert_eq!(stats.io().max(), Duration::from_micros(250));
//! ```

pub mod aggregator;

use std::time::Duration;

/// Accumulated latency, maximum latency and operation count for one scope
/// (a worker thread or a device).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyStats {
    sum: Duration,
    max: Duration,
    count: u64,
}

impl LatencyStats {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one operation's latency
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        self.sum += latency;
        if latency > self.max {
            self.max = latency;
        }
        self.count += 1;
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &LatencyStats) {
        self.sum += other.sum;
        if other.max > self.max {
            self.max = other.max;
        }
        self.count += other.count;
    }

    /// Accumulated I/O time
    #[inline]
    pub fn sum(&self) -> Duration {
        self.sum
    }

    /// Largest single-operation latency observed
    #[inline]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Number of recorded operations
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean latency, or zero when nothing was recorded
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.sum / self.count as u32
        }
    }
}

/// Statistics owned by a single worker thread.
///
/// Holds the worker's own accumulator plus one accumulator per device the
/// run targets. The per-device entries are private to this worker while it
/// runs; the coordinator merges them across workers after join.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// All operations performed by this worker
    io: LatencyStats,

    /// Per-device breakdown, indexed by device id
    per_device: Vec<LatencyStats>,

    /// Highest number of simultaneously in-flight operations observed
    /// (always 1 for the blocking executor)
    peak_in_flight: usize,

    /// This worker's own execution span, set when its loop finishes
    span: Duration,
}

impl WorkerStats {
    /// Create statistics for a worker targeting `device_count` devices
    pub fn new(device_count: usize) -> Self {
        Self {
            io: LatencyStats::new(),
            per_device: vec![LatencyStats::new(); device_count],
            peak_in_flight: 0,
            span: Duration::ZERO,
        }
    }

    /// Record one completed operation against `device`
    ///
    /// # Panics
    ///
    /// Panics if `device` is out of range for this run.
    #[inline]
    pub fn record(&mut self, device: usize, latency: Duration) {
        self.io.record(latency);
        self.per_device[device].record(latency);
    }

    /// Track the in-flight high-water mark
    #[inline]
    pub fn sample_in_flight(&mut self, in_flight: usize) {
        if in_flight > self.peak_in_flight {
            self.peak_in_flight = in_flight;
        }
    }

    /// This worker's aggregate accumulator
    pub fn io(&self) -> &LatencyStats {
        &self.io
    }

    /// Per-device accumulators, indexed by device id
    pub fn per_device(&self) -> &[LatencyStats] {
        &self.per_device
    }

    /// Highest simultaneous in-flight count observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Record this worker's execution span
    pub fn set_span(&mut self, span: Duration) {
        self.span = span;
    }

    /// Execution span of this worker's loop
    pub fn span(&self) -> Duration {
        self.span
    }
}
