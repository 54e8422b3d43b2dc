//! Configuration module
//!
//! Handles CLI argument parsing and validation. The resolved [`Config`] is
//! immutable after setup and shared by reference with every worker thread;
//! there is no ambient global state.

pub mod cli;
pub mod validator;

use cli::Cli;
use std::path::PathBuf;
use thiserror::Error;

/// Hard limit on the number of worker threads
pub const MAX_THREADS: usize = 4096;

/// Hard limit on the number of devices per run
pub const MAX_DEVICES: usize = 64;

/// Hard limit on per-thread async concurrency
pub const MAX_CONCURRENCY: usize = 4096;

/// Access pattern for target generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    /// Uniformly random block offsets and device selection
    Random,
    /// Strictly increasing offsets with fixed per-thread device affinity
    Sequential,
}

/// Transfer direction for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Complete run configuration
///
/// Built from the CLI, then finalized by
/// [`validator::resolve_and_validate`], which probes device sizes where the
/// range was left open and applies the sequential count default. After that
/// the configuration never changes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Random or sequential access
    pub pattern: AccessPattern,

    /// Read or write operations
    pub direction: Direction,

    /// Transfer unit in bytes, used for every operation
    pub block_size: usize,

    /// First block offset of the access range (inclusive)
    pub start_block: u64,

    /// Last block offset of the access range (exclusive); 0 means
    /// "probe the device size" until resolved
    pub end_block: u64,

    /// Number of operations each worker thread performs
    pub ops_per_thread: u64,

    /// Number of worker threads
    pub threads: usize,

    /// In-flight async operations per thread; 0 selects the blocking engine
    pub concurrency: usize,

    /// Open devices with O_DIRECT
    pub direct: bool,

    /// Open devices with O_SYNC
    pub sync: bool,

    /// Verbosity level (repeatable -v)
    pub verbosity: u8,

    /// Device or file paths, in command-line order
    pub devices: Vec<PathBuf>,
}

impl Config {
    /// Build a configuration from parsed CLI arguments.
    ///
    /// Resolves the access-pattern flags into a single enum value; all other
    /// checks live in [`validator::resolve_and_validate`].
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let pattern = match (cli.random, cli.sequential) {
            (true, true) => return Err(ConfigError::ConflictingPattern),
            (false, false) => return Err(ConfigError::MissingPattern),
            (true, false) => AccessPattern::Random,
            (false, true) => AccessPattern::Sequential,
        };

        let direction = if cli.write {
            Direction::Write
        } else {
            Direction::Read
        };

        Ok(Self {
            pattern,
            direction,
            block_size: cli.block_size,
            start_block: cli.start,
            end_block: cli.end,
            ops_per_thread: cli.count,
            threads: cli.threads,
            concurrency: cli.concurrency,
            direct: cli.direct,
            sync: cli.sync,
            verbosity: cli.verbose,
            devices: cli.devices.clone(),
        })
    }

    /// Number of blocks in the configured range
    pub fn block_count(&self) -> u64 {
        self.end_block - self.start_block
    }

    /// Total operations across all threads
    pub fn total_ops(&self) -> u64 {
        self.ops_per_thread * self.threads as u64
    }

    /// Whether the run uses the bounded-concurrency async engine
    pub fn is_async(&self) -> bool {
        self.concurrency > 0
    }
}

/// Errors detected before any worker starts.
///
/// All of these are reported with the usage text and terminate the process
/// with a failure status; no device is opened for I/O once one is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("-R and -S cannot be specified simultaneously")]
    ConflictingPattern,

    #[error("access mode must be specified (-R or -S)")]
    MissingPattern,

    #[error("no device or file specified")]
    NoDevices,

    #[error("block size must be greater than 0")]
    BlockSizeZero,

    #[error("multiplex degree {0} exceeds the system limit")]
    ThreadLimit(usize),

    #[error("number of devices {0} exceeds the system limit")]
    DeviceLimit(usize),

    #[error("async concurrency {0} exceeds the system limit")]
    ConcurrencyLimit(usize),

    #[error("access range is not correctly set ({start} {end})")]
    InvertedRange { start: u64, end: u64 },

    #[error("devices of different sizes are specified ({path:?}: {size} bytes, expected {expected})")]
    MismatchedDeviceSizes {
        path: PathBuf,
        size: u64,
        expected: u64,
    },

    #[error(
        "cannot determine the size of {path:?}; specify the access range explicitly with -s and -e"
    )]
    SizeProbe {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("operation count {count} exceeds the {range}-block access range in sequential mode")]
    CountExceedsRange { count: u64, range: u64 },

    #[error("async mode (-A) is not available on this platform (no native AIO facility)")]
    AsyncUnavailable,
}
