//! Blocking executor
//!
//! One operation at a time: compute the target, time a full positioned
//! transfer of exactly one block, record the latency against the thread and
//! the device it hit. The engine retries partial transfers internally, so a
//! successful completion always moved the whole block; anything else is a
//! genuine transfer failure and ends the run.

use crate::config::{Config, Direction};
use crate::engine::{EngineConfig, IoEngine, IoRequest, OpKind};
use crate::plan::WorkloadPlan;
use crate::stats::WorkerStats;
use crate::util::buffer::{alignment_for, AlignedBuffer};
use crate::Result;
use anyhow::Context;
use std::os::unix::io::RawFd;
use std::time::Instant;

/// Executor performing one blocking transfer per iteration.
pub struct BlockingExecutor {
    engine: Box<dyn IoEngine>,
    plan: WorkloadPlan,
    fds: Vec<RawFd>,
    kind: OpKind,
    block_size: usize,
    total: u64,
    buffer: AlignedBuffer,
    stats: WorkerStats,
}

impl BlockingExecutor {
    /// Build the executor for one worker thread.
    pub fn new(
        engine: Box<dyn IoEngine>,
        plan: WorkloadPlan,
        fds: Vec<RawFd>,
        config: &Config,
    ) -> Self {
        let device_count = fds.len();
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
            buffer: AlignedBuffer::new(config.block_size, alignment_for(config.direct)),
            stats: WorkerStats::new(device_count),
        }
    }

    /// Run the loop to completion and return the collected statistics.
    pub fn run(mut self) -> Result<WorkerStats> {
        self.engine
            .init(&EngineConfig { queue_depth: 1 })
            .context("failed to initialize IO engine")?;

        let loop_started = Instant::now();
        let buffer_ptr = self.buffer.as_mut_ptr();

        for iteration in 0..self.total {
            let target = self.plan.next_target(iteration);

            let started = Instant::now();
            self.engine.submit(IoRequest {
                kind: self.kind,
                fd: self.fds[target.device],
                offset: target.offset,
                buffer: buffer_ptr,
                length: self.block_size,
                slot: 0,
            })?;

            let completion = self
                .engine
                .poll_completions()?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("blocking engine returned no completion"))?;

            let bytes = completion.result.with_context(|| {
                format!(
                    "{} failed at offset {} on device {}",
                    completion.kind, target.offset, target.device
                )
            })?;
            if bytes != self.block_size {
                anyhow::bail!(
                    "short {}: {} of {} bytes at offset {} on device {}",
                    completion.kind,
                    bytes,
                    self.block_size,
                    target.offset,
                    target.device
                );
            }

            // Monotonic clock, so the elapsed value cannot go negative
            let elapsed = started.elapsed();
            self.stats.record(target.device, elapsed);
            self.stats.sample_in_flight(1);
        }

        self.engine
            .cleanup()
            .context("failed to cleanup IO engine")?;

        self.stats.set_span(loop_started.elapsed());
        Ok(self.stats)
    }
}
