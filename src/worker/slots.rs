//! Async executor
//!
//! Keeps up to `concurrency` operations in flight per worker thread through
//! a ring of slots. Each slot owns its transfer buffer and is either idle or
//! holds exactly one submitted operation together with its submit timestamp.
//!
//! The loop visits slots in ring order: an idle slot gets the next planned
//! operation submitted into it (while any remain), then the engine is polled
//! once without blocking and every returned completion is checked, timed and
//! retired. This is a busy-polling loop by construction — there is no wait
//! or wake mechanism, and CPU usage rises with poll frequency on fast
//! devices. The slot count is the backpressure bound: the queue can never
//! grow past it.
//!
//! Latency here is full request turnaround (submit to observed completion),
//! which includes queueing and submission overhead, not device service time
//! alone. A completion that moved fewer bytes than one block is fatal —
//! unlike the blocking path there is no retry plumbing for in-flight
//! operations.

use crate::config::{Config, Direction};
use crate::engine::{EngineConfig, IoEngine, IoRequest, OpKind};
use crate::plan::WorkloadPlan;
use crate::stats::WorkerStats;
use crate::util::buffer::{alignment_for, AlignedBuffer};
use crate::Result;
use anyhow::Context;
use std::os::unix::io::RawFd;
use std::time::Instant;

/// One in-flight request context.
struct Slot {
    /// Transfer buffer owned by this slot
    buffer: AlignedBuffer,

    /// Whether an operation is currently in flight in this slot
    busy: bool,

    /// Submit timestamp of the in-flight operation
    submitted_at: Instant,

    /// Device the in-flight operation targets
    device: usize,
}

/// Executor keeping a bounded ring of operations in flight.
pub struct AsyncExecutor {
    engine: Box<dyn IoEngine>,
    plan: WorkloadPlan,
    fds: Vec<RawFd>,
    kind: OpKind,
    block_size: usize,
    total: u64,
    concurrency: usize,
    slots: Vec<Slot>,
    stats: WorkerStats,
}

impl AsyncExecutor {
    /// Build the executor for one worker thread.
    pub fn new(
        engine: Box<dyn IoEngine>,
        plan: WorkloadPlan,
        fds: Vec<RawFd>,
        config: &Config,
    ) -> Self {
        let device_count = fds.len();
        let alignment = alignment_for(config.direct);
        let slots = (0..config.concurrency)
            .map(|_| Slot {
                buffer: AlignedBuffer::new(config.block_size, alignment),
                busy: false,
                submitted_at: Instant::now(),
                device: 0,
            })
            .collect();

        Self {
            engine,
            plan,
            fds,
            kind: match config.direction {
                Direction::Read => OpKind::Read,
                Direction::Write => OpKind::Write,
            },
            block_size: config.block_size,
            total: config.ops_per_thread,
            concurrency: config.concurrency,
            slots,
            stats: WorkerStats::new(device_count),
        }
    }

    /// Run the poll loop until every operation has completed.
    pub fn run(mut self) -> Result<WorkerStats> {
        self.engine
            .init(&EngineConfig {
                queue_depth: self.concurrency,
            })
            .context("failed to initialize IO engine")?;

        let loop_started = Instant::now();

        let mut issued: u64 = 0;
        let mut completed: u64 = 0;
        let mut in_flight: usize = 0;
        let mut cursor: usize = 0;

        while completed < self.total {
            let slot_id = cursor % self.concurrency;
            cursor = cursor.wrapping_add(1);

            if !self.slots[slot_id].busy && issued < self.total {
                let target = self.plan.next_target(issued);

                let slot = &mut self.slots[slot_id];
                slot.device = target.device;
                slot.submitted_at = Instant::now();
                let buffer_ptr = slot.buffer.as_mut_ptr();

                // A hard submission error (not a pending state) ends the run
                self.engine
                    .submit(IoRequest {
                        kind: self.kind,
                        fd: self.fds[target.device],
                        offset: target.offset,
                        buffer: buffer_ptr,
                        length: self.block_size,
                        slot: slot_id as u64,
                    })
                    .with_context(|| {
                        format!(
                            "submission failed at offset {} on device {}",
                            target.offset, target.device
                        )
                    })?;

                self.slots[slot_id].busy = true;
                issued += 1;
                in_flight += 1;
                self.stats.sample_in_flight(in_flight);
            }

            for completion in self.engine.poll_completions()? {
                let slot_id = completion.slot as usize;
                debug_assert!(self.slots[slot_id].busy, "completion for an idle slot");

                let bytes = completion.result.with_context(|| {
                    format!(
                        "{} failed on device {}",
                        completion.kind, self.slots[slot_id].device
                    )
                })?;
                if bytes != self.block_size {
                    anyhow::bail!(
                        "partial {}: {} of {} bytes on device {}",
                        completion.kind,
                        bytes,
                        self.block_size,
                        self.slots[slot_id].device
                    );
                }

                // Full turnaround from submission, monotonic clock
                let slot = &mut self.slots[slot_id];
                let elapsed = slot.submitted_at.elapsed();
                self.stats.record(slot.device, elapsed);
                slot.busy = false;
                completed += 1;
                in_flight -= 1;
            }
        }

        self.engine
            .cleanup()
            .context("failed to cleanup IO engine")?;

        self.stats.set_span(loop_started.elapsed());
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessPattern;
    use crate::engine::mock::MockEngine;
    use std::path::PathBuf;

    fn config(concurrency: usize, ops: u64, devices: usize) -> Config {
        Config {
            pattern: AccessPattern::Sequential,
            direction: Direction::Read,
            block_size: 4096,
            start_block: 0,
            end_block: 1000,
            ops_per_thread: ops,
            threads: 1,
            concurrency,
            direct: false,
            sync: false,
            verbosity: 0,
            devices: (0..devices)
                .map(|i| PathBuf::from(format!("/dev/fake{}", i)))
                .collect(),
        }
    }

    fn executor(engine: MockEngine, config: &Config) -> AsyncExecutor {
        let plan = WorkloadPlan::with_seed(config, 0, 1);
        let fds = vec![3; config.devices.len()];
        AsyncExecutor::new(Box::new(engine), plan, fds, config)
    }

    #[test]
    fn test_async_completes_exact_total() {
        let config = config(4, 16, 1);
        let stats = executor(MockEngine::new(), &config).run().unwrap();

        assert_eq!(stats.io().count(), 16);
        assert_eq!(stats.per_device()[0].count(), 16);
    }

    #[test]
    fn test_async_fills_ring_before_draining() {
        // With completions withheld until the ring is full, every slot must
        // go busy before the first one retires.
        let config = config(4, 4, 1);
        let engine = MockEngine::new();
        engine.hold_until_pending(4);

        let stats = executor(engine, &config).run().unwrap();

        assert_eq!(stats.peak_in_flight(), 4);
        assert_eq!(stats.io().count(), 4);
    }

    #[test]
    fn test_async_in_flight_never_exceeds_concurrency() {
        let config = config(3, 50, 2);
        let engine = MockEngine::new();
        engine.hold_until_pending(3);

        let stats = executor(engine, &config).run().unwrap();

        assert!(stats.peak_in_flight() <= 3);
        assert_eq!(stats.io().count(), 50);
    }

    #[test]
    fn test_async_issues_planned_sequence() {
        let config = config(2, 6, 1);
        let engine = MockEngine::new();
        let handle = engine.clone();

        executor(engine, &config).run().unwrap();

        let offsets: Vec<u64> = handle.submitted_requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 4096, 8192, 12288, 16384, 20480]);
    }

    #[test]
    fn test_async_partial_completion_is_fatal() {
        let config = config(4, 8, 1);
        let engine = MockEngine::new();
        engine.set_bytes_per_op(2048);

        let err = executor(engine, &config).run().unwrap_err();
        assert!(err.to_string().contains("partial"));
    }

    #[test]
    fn test_async_completion_error_is_fatal() {
        let config = config(4, 8, 1);
        let engine = MockEngine::new();
        engine.set_should_fail(true);

        assert!(executor(engine, &config).run().is_err());
    }

    #[test]
    fn test_async_write_kind_tagged() {
        let mut config = config(2, 4, 1);
        config.direction = Direction::Write;
        let engine = MockEngine::new();
        let handle = engine.clone();

        executor(engine, &config).run().unwrap();

        for request in handle.submitted_requests() {
            assert_eq!(request.kind, OpKind::Write);
        }
    }

    #[test]
    fn test_async_zero_ops() {
        let config = config(2, 0, 1);
        let stats = executor(MockEngine::new(), &config).run().unwrap();
        assert_eq!(stats.io().count(), 0);
        assert_eq!(stats.peak_in_flight(), 0);
    }
}
