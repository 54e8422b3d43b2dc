//! Coordinator
//!
//! Owns the device list and the worker pool for one run. Devices are opened
//! exactly once, before any worker starts, and shared read-only with every
//! worker thread; workers are joined to completion and their statistics
//! merged into the final [`RunStats`].
//!
//! There is no per-thread error isolation: a worker hitting an unrecoverable
//! transfer error reports it and takes the whole process down with exit
//! status 1. The run either completes its configured operation count or
//! produces no result at all.

use crate::config::Config;
use crate::device::Device;
use crate::stats::aggregator::RunStats;
use crate::worker::Worker;
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Run owner: devices plus the worker pool.
pub struct Coordinator {
    config: Arc<Config>,
    devices: Arc<Vec<Device>>,
}

impl Coordinator {
    /// Open every configured device and prepare the run.
    ///
    /// Open flags follow the run direction plus the direct/sync options;
    /// a device that fails to open aborts setup before any thread exists.
    pub fn new(config: Config) -> Result<Self> {
        let mut devices = Vec::with_capacity(config.devices.len());
        for path in &config.devices {
            devices.push(
                Device::open(path, config.direction, config.direct, config.sync)
                    .with_context(|| format!("cannot set up device {}", path.display()))?,
            );
        }

        Ok(Self {
            config: Arc::new(config),
            devices: Arc::new(devices),
        })
    }

    /// Spawn all workers, join them, and aggregate the run.
    ///
    /// The wall-clock span covers first spawn to last join and is the basis
    /// for all derived throughput figures.
    pub fn run(self) -> Result<RunStats> {
        let started = Instant::now();

        let mut handles = Vec::with_capacity(self.config.threads);
        for id in 0..self.config.threads {
            let config = Arc::clone(&self.config);
            let devices = Arc::clone(&self.devices);

            let handle = thread::Builder::new()
                .name(format!("ioprobe-{}", id))
                .spawn(move || {
                    if config.verbosity >= 4 {
                        println!("worker[{}] starts", id);
                    }

                    let worker = Worker::new(id, Arc::clone(&config), devices);
                    match worker.run() {
                        Ok(stats) => {
                            if config.verbosity >= 4 {
                                println!("worker[{}] ends", id);
                            }
                            stats
                        }
                        Err(err) => {
                            // No partial results: the first unrecoverable
                            // error ends the whole measurement
                            eprintln!("ioprobe: worker {}: {:#}", id, err);
                            std::process::exit(1);
                        }
                    }
                })
                .with_context(|| format!("failed to spawn worker {}", id))?;

            handles.push(handle);
        }

        let mut workers = Vec::with_capacity(handles.len());
        for handle in handles {
            let stats = handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
            workers.push(stats);
        }

        let wall = started.elapsed();
        Ok(RunStats::from_workers(workers, self.devices.len(), wall))
    }
}
