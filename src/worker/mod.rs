//! Worker thread implementation
//!
//! A [`Worker`] is one execution unit of a run. It owns its engine, its
//! workload plan, its transfer buffers and its statistics; the only shared
//! state it touches are the read-only device descriptors and the immutable
//! configuration. Workers communicate results exclusively through the
//! statistics they return at join.
//!
//! Each worker picks its execution strategy from the configuration: a
//! concurrency of 0 selects the blocking executor (one operation at a time,
//! partial transfers retried in place), anything greater selects the async
//! executor (that many operations kept in flight through the AIO engine).

pub mod blocking;
pub mod slots;

use crate::config::Config;
use crate::device::Device;
use crate::engine::sync::SyncEngine;
use crate::engine::IoEngine;
use crate::plan::WorkloadPlan;
use crate::stats::WorkerStats;
use crate::Result;
use anyhow::Context;
use std::sync::Arc;

use blocking::BlockingExecutor;
use slots::AsyncExecutor;

/// One worker thread's execution unit.
pub struct Worker {
    /// Worker index, also the thread's device-affinity key
    id: usize,

    /// Shared run configuration
    config: Arc<Config>,

    /// Shared devices, opened by the coordinator before any worker started
    devices: Arc<Vec<Device>>,
}

impl Worker {
    /// Create a worker for thread `id`.
    pub fn new(id: usize, config: Arc<Config>, devices: Arc<Vec<Device>>) -> Self {
        Self {
            id,
            config,
            devices,
        }
    }

    /// Execute this worker's share of the run and return its statistics.
    ///
    /// Transfer errors are returned to the caller; the coordinator treats
    /// them as fatal for the whole process.
    pub fn run(&self) -> Result<WorkerStats> {
        let plan = WorkloadPlan::new(&self.config, self.id);
        let fds: Vec<_> = self.devices.iter().map(|d| d.fd()).collect();
        let engine = create_engine(&self.config)?;

        if self.config.is_async() {
            AsyncExecutor::new(engine, plan, fds, &self.config)
                .run()
                .with_context(|| format!("worker {} (async) failed", self.id))
        } else {
            BlockingExecutor::new(engine, plan, fds, &self.config)
                .run()
                .with_context(|| format!("worker {} failed", self.id))
        }
    }
}

/// Pick the engine for the configured strategy.
///
/// The async engine exists only on Linux; the validator already rejects
/// async configurations elsewhere, so the error here is a backstop for
/// programmatic configs that skipped validation.
fn create_engine(config: &Config) -> Result<Box<dyn IoEngine>> {
    if config.is_async() {
        #[cfg(target_os = "linux")]
        {
            Ok(Box::new(crate::engine::libaio::LibaioEngine::new()))
        }
        #[cfg(not(target_os = "linux"))]
        {
            anyhow::bail!("async mode requires the native AIO facility, unavailable on this platform")
        }
    } else {
        Ok(Box::new(SyncEngine::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessPattern, Direction};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn temp_target(blocks: u64, block_size: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; (blocks as usize) * block_size])
            .unwrap();
        file.flush().unwrap();
        file
    }

    fn config_for(files: &[&NamedTempFile], ops: u64) -> Config {
        Config {
            pattern: AccessPattern::Sequential,
            direction: Direction::Read,
            block_size: 4096,
            start_block: 0,
            end_block: 100,
            ops_per_thread: ops,
            threads: 1,
            concurrency: 0,
            direct: false,
            sync: false,
            verbosity: 0,
            devices: files
                .iter()
                .map(|f| f.path().to_path_buf())
                .collect::<Vec<PathBuf>>(),
        }
    }

    #[test]
    fn test_worker_blocking_run() {
        let file = temp_target(100, 4096);
        let config = config_for(&[&file], 10);

        let devices: Vec<Device> = config
            .devices
            .iter()
            .map(|p| Device::open(p, Direction::Read, false, false).unwrap())
            .collect();

        let worker = Worker::new(0, Arc::new(config), Arc::new(devices));
        let stats = worker.run().unwrap();

        assert_eq!(stats.io().count(), 10);
        assert_eq!(stats.per_device()[0].count(), 10);
        assert_eq!(stats.peak_in_flight(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_worker_async_run() {
        let file = temp_target(100, 4096);
        let mut config = config_for(&[&file], 16);
        config.concurrency = 4;

        let devices: Vec<Device> = config
            .devices
            .iter()
            .map(|p| Device::open(p, Direction::Read, false, false).unwrap())
            .collect();

        let worker = Worker::new(0, Arc::new(config), Arc::new(devices));
        let stats = worker.run().unwrap();

        assert_eq!(stats.io().count(), 16);
        assert!(stats.peak_in_flight() <= 4);
    }
}
