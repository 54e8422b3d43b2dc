//! IO engine abstraction
//!
//! An engine is the boundary between an executor and the kernel: it accepts
//! positioned read/write requests and hands back completions. Two real
//! engines exist — the blocking engine built on pread/pwrite (always
//! available) and the Linux native AIO engine — plus a mock for tests. The
//! executor picks the engine from the configuration at run time; on
//! platforms without the AIO facility, requesting it is a configuration
//! error rather than a missing compile-time feature.
//!
//! Completions carry the request's operation kind as an explicit tag, so
//! the executor dispatches on it directly instead of storing callbacks.
//!
//! # Lifecycle
//!
//! 1. `init()` with the queue depth
//! 2. `submit()` requests and `poll_completions()` until done
//! 3. `cleanup()` when the run is over
//!
//! Engines must be `Send` so a worker thread can own one; they are not
//! shared between threads.

use crate::Result;
use std::os::unix::io::RawFd;

/// Uniform interface over the kernel submission/completion mechanisms.
pub trait IoEngine: Send {
    /// Prepare the engine for up to `config.queue_depth` in-flight requests.
    fn init(&mut self, config: &EngineConfig) -> Result<()>;

    /// Submit one request.
    ///
    /// The blocking engine performs the transfer before returning; the AIO
    /// engine queues it with the kernel. An error here is a hard submission
    /// failure, not a pending state.
    ///
    /// The caller guarantees the request's buffer stays valid and correctly
    /// aligned until the matching completion has been polled.
    fn submit(&mut self, op: IoRequest) -> Result<()>;

    /// Collect completions without blocking.
    ///
    /// Returns every completion available right now, possibly none. The
    /// blocking engine returns the result of the request it just performed.
    fn poll_completions(&mut self) -> Result<Vec<IoCompletion>>;

    /// Release engine resources. The engine must not be used afterwards.
    fn cleanup(&mut self) -> Result<()>;
}

/// Engine initialization parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of in-flight requests the engine must support.
    /// The blocking engine ignores anything above 1.
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { queue_depth: 1 }
    }
}

/// Operation kind, carried from submission to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Read,
    Write,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Read => write!(f, "read"),
            OpKind::Write => write!(f, "write"),
        }
    }
}

/// One positioned transfer request.
///
/// `slot` is opaque to the engine and returned in the completion; executors
/// use it to map completions back to their slot ring.
#[derive(Debug)]
pub struct IoRequest {
    /// Read or write
    pub kind: OpKind,

    /// Descriptor of the target device or file
    pub fd: RawFd,

    /// Byte offset of the transfer
    pub offset: u64,

    /// Transfer buffer; must stay valid until the completion is polled and
    /// be aligned to the device block size when O_DIRECT is in effect
    pub buffer: *mut u8,

    /// Transfer length in bytes
    pub length: usize,

    /// Caller tag echoed in the completion
    pub slot: u64,
}

// Safety: the raw buffer pointer never leaves the owning worker thread; the
// caller manages the buffer's lifetime across submit/poll.
unsafe impl Send for IoRequest {}

/// Result of a completed request.
#[derive(Debug)]
pub struct IoCompletion {
    /// Tag from the originating request
    pub slot: u64,

    /// Bytes transferred, or the error the kernel reported
    pub result: Result<usize>,

    /// Kind of the originating request
    pub kind: OpKind,
}

pub mod mock;
pub mod sync;

#[cfg(target_os = "linux")]
pub mod libaio;
