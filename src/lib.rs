//! ioprobe - block device and file I/O measurement tool
//!
//! ioprobe drives a configurable load of positioned reads or writes against
//! one or more devices or files and reports latency and throughput. Workers
//! are plain OS threads; each one either performs blocking I/O one operation
//! at a time, or keeps a bounded ring of asynchronous operations in flight
//! through Linux native AIO.
//!
//! # Architecture
//!
//! - **Engines**: blocking pread/pwrite and Linux native AIO behind one trait
//! - **Workload plans**: sequential or uniform-random targets, per thread
//! - **Statistics**: per-thread and per-device sum/max/count, merged at join
//! - **Coordinator**: opens devices, spawns workers, aggregates the run

pub mod config;
pub mod coordinator;
pub mod device;
pub mod engine;
pub mod output;
pub mod plan;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use engine::IoEngine;

/// Result type used throughout ioprobe
pub type Result<T> = anyhow::Result<T>;
