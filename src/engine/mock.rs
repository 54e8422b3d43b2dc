//! Mock IO engine for tests
//!
//! Simulates the engine interface without any system calls. Internals live
//! behind shared handles, so a test can keep a clone of the engine while an
//! executor owns the original and steer its behavior mid-run:
//!
//! - fail every operation with a configurable message
//! - return fewer bytes than requested (partial completion)
//! - hold completions back until a given number of requests is pending,
//!   which forces an async executor to fill its whole slot ring

use super::{EngineConfig, IoCompletion, IoEngine, IoRequest, OpKind};
use crate::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Record of a submitted request, for test assertions.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub kind: OpKind,
    pub fd: i32,
    pub offset: u64,
    pub length: usize,
    pub slot: u64,
}

/// Pending request held by the mock until the next eligible poll.
#[derive(Debug)]
struct PendingOp {
    kind: OpKind,
    length: usize,
    slot: u64,
}

#[derive(Debug)]
struct MockState {
    pending: VecDeque<PendingOp>,
    submitted: Vec<RequestRecord>,
    should_fail: bool,
    error_message: String,
    bytes_per_op: usize,
    hold_until_pending: usize,
}

/// Mock engine with shared, clonable state.
#[derive(Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    /// Create a mock that completes every request at the next poll with the
    /// requested byte count.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                pending: VecDeque::new(),
                submitted: Vec::new(),
                should_fail: false,
                error_message: "mock IO error".to_string(),
                bytes_per_op: 0, // 0 means echo the requested length
                hold_until_pending: 0,
            })),
        }
    }

    /// Fail every completion with the configured message.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.state.lock().unwrap().should_fail = should_fail;
    }

    /// Set the message used for failed completions.
    pub fn set_error_message(&self, message: impl Into<String>) {
        self.state.lock().unwrap().error_message = message.into();
    }

    /// Complete every request with `bytes` instead of the requested length.
    /// Simulates partial transfers; 0 restores echoing the request.
    pub fn set_bytes_per_op(&self, bytes: usize) {
        self.state.lock().unwrap().bytes_per_op = bytes;
    }

    /// Withhold completions until at least `n` requests are pending.
    ///
    /// With `n` equal to an executor's concurrency, every slot must go busy
    /// before the first completion is released.
    pub fn hold_until_pending(&self, n: usize) {
        self.state.lock().unwrap().hold_until_pending = n;
    }

    /// Number of requests submitted but not yet completed.
    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Copies of every submitted request, in order.
    pub fn submitted_requests(&self) -> Vec<RequestRecord> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IoEngine for MockEngine {
    fn init(&mut self, _config: &EngineConfig) -> Result<()> {
        Ok(())
    }

    fn submit(&mut self, op: IoRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        state.submitted.push(RequestRecord {
            kind: op.kind,
            fd: op.fd,
            offset: op.offset,
            length: op.length,
            slot: op.slot,
        });

        state.pending.push_back(PendingOp {
            kind: op.kind,
            length: op.length,
            slot: op.slot,
        });

        Ok(())
    }

    fn poll_completions(&mut self) -> Result<Vec<IoCompletion>> {
        let mut state = self.state.lock().unwrap();

        if state.pending.len() < state.hold_until_pending {
            return Ok(Vec::new());
        }
        // Once the threshold is reached the gate stays open
        state.hold_until_pending = 0;

        let mut completions = Vec::new();
        while let Some(op) = state.pending.pop_front() {
            let result = if state.should_fail {
                Err(anyhow::anyhow!(state.error_message.clone()))
            } else if state.bytes_per_op > 0 {
                Ok(state.bytes_per_op)
            } else {
                Ok(op.length)
            };

            completions.push(IoCompletion {
                slot: op.slot,
                result,
                kind: op.kind,
            });
        }

        Ok(completions)
    }

    fn cleanup(&mut self) -> Result<()> {
        self.state.lock().unwrap().pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slot: u64) -> IoRequest {
        IoRequest {
            kind: OpKind::Read,
            fd: 1,
            offset: slot * 4096,
            buffer: std::ptr::null_mut(),
            length: 4096,
            slot,
        }
    }

    #[test]
    fn test_mock_completes_on_poll() {
        let mut engine = MockEngine::new();
        engine.init(&EngineConfig::default()).unwrap();

        engine.submit(request(42)).unwrap();

        let completions = engine.poll_completions().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].slot, 42);
        assert_eq!(*completions[0].result.as_ref().unwrap(), 4096);
    }

    #[test]
    fn test_mock_failure() {
        let mut engine = MockEngine::new();
        engine.set_should_fail(true);
        engine.set_error_message("boom");
        engine.init(&EngineConfig::default()).unwrap();

        engine.submit(request(1)).unwrap();

        let completions = engine.poll_completions().unwrap();
        assert_eq!(
            completions[0].result.as_ref().unwrap_err().to_string(),
            "boom"
        );
    }

    #[test]
    fn test_mock_partial_transfer() {
        let mut engine = MockEngine::new();
        engine.set_bytes_per_op(2048);
        engine.init(&EngineConfig::default()).unwrap();

        engine.submit(request(1)).unwrap();

        let completions = engine.poll_completions().unwrap();
        assert_eq!(*completions[0].result.as_ref().unwrap(), 2048);
    }

    #[test]
    fn test_mock_holds_until_threshold() {
        let mut engine = MockEngine::new();
        engine.hold_until_pending(3);
        engine.init(&EngineConfig::default()).unwrap();

        engine.submit(request(0)).unwrap();
        assert!(engine.poll_completions().unwrap().is_empty());

        engine.submit(request(1)).unwrap();
        assert!(engine.poll_completions().unwrap().is_empty());

        engine.submit(request(2)).unwrap();
        let completions = engine.poll_completions().unwrap();
        assert_eq!(completions.len(), 3);

        // Gate stays open afterwards
        engine.submit(request(3)).unwrap();
        assert_eq!(engine.poll_completions().unwrap().len(), 1);
    }

    #[test]
    fn test_mock_records_submissions() {
        let mut engine = MockEngine::new();
        let handle = engine.clone();
        engine.init(&EngineConfig::default()).unwrap();

        engine.submit(request(0)).unwrap();
        engine.submit(request(1)).unwrap();

        let submitted = handle.submitted_requests();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].offset, 4096);
    }
}
