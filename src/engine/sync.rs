//! Blocking IO engine
//!
//! Performs each transfer with a positioned pread/pwrite syscall and hands
//! the result back through the completion interface. Always available, on
//! every platform; queue depth is effectively 1.
//!
//! Partial transfers are retried in place: the buffer pointer advances and
//! the remaining count shrinks until the full request has moved. A read
//! that hits end-of-file before the request is satisfied cannot make
//! progress and is reported as an error.

use super::{EngineConfig, IoCompletion, IoEngine, IoRequest, OpKind};
use crate::Result;
use anyhow::Context;

/// Blocking engine using pread/pwrite.
///
/// `submit` performs the whole transfer; the following `poll_completions`
/// returns its single completion.
pub struct SyncEngine {
    /// Completion of the most recent request (queue depth is 1)
    pending_completion: Option<IoCompletion>,
}

impl SyncEngine {
    /// Create a new blocking engine
    pub fn new() -> Self {
        Self {
            pending_completion: None,
        }
    }

    /// Read exactly `length` bytes at `offset`, retrying partial reads.
    #[inline(always)]
    fn do_read(&self, fd: i32, buffer: *mut u8, length: usize, offset: u64) -> Result<usize> {
        let mut total_read = 0;
        let mut current_offset = offset;

        while total_read < length {
            let remaining = length - total_read;
            let buf_ptr = unsafe { buffer.add(total_read) };

            // SAFETY: the caller guarantees the buffer is valid for `length`
            // bytes and stays alive for the duration of this call.
            let result = unsafe {
                libc::pread(
                    fd,
                    buf_ptr as *mut libc::c_void,
                    remaining,
                    current_offset as i64,
                )
            };

            if result < 0 {
                let err = std::io::Error::last_os_error();
                return Err(err).context(format!(
                    "pread failed: fd={}, offset={}, length={}",
                    fd, current_offset, remaining
                ));
            }

            if result == 0 {
                // EOF before the block was complete; retrying cannot make
                // progress, and a fixed-size target never hits this in a
                // valid configuration.
                anyhow::bail!(
                    "unexpected end of file: fd={}, offset={}, {} bytes short",
                    fd,
                    current_offset,
                    remaining
                );
            }

            let bytes_read = result as usize;
            total_read += bytes_read;
            current_offset += bytes_read as u64;
        }

        Ok(total_read)
    }

    /// Write exactly `length` bytes at `offset`, retrying partial writes.
    #[inline(always)]
    fn do_write(&self, fd: i32, buffer: *const u8, length: usize, offset: u64) -> Result<usize> {
        let mut total_written = 0;
        let mut current_offset = offset;

        while total_written < length {
            let remaining = length - total_written;
            let buf_ptr = unsafe { buffer.add(total_written) };

            // SAFETY: the caller guarantees the buffer is valid for `length`
            // bytes and stays alive for the duration of this call.
            let result = unsafe {
                libc::pwrite(
                    fd,
                    buf_ptr as *const libc::c_void,
                    remaining,
                    current_offset as i64,
                )
            };

            if result < 0 {
                let err = std::io::Error::last_os_error();
                return Err(err).context(format!(
                    "pwrite failed: fd={}, offset={}, length={}",
                    fd, current_offset, remaining
                ));
            }

            let bytes_written = result as usize;
            total_written += bytes_written;
            current_offset += bytes_written as u64;
        }

        Ok(total_written)
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IoEngine for SyncEngine {
    fn init(&mut self, _config: &EngineConfig) -> Result<()> {
        Ok(())
    }

    fn submit(&mut self, op: IoRequest) -> Result<()> {
        let result = match op.kind {
            OpKind::Read => self.do_read(op.fd, op.buffer, op.length, op.offset),
            OpKind::Write => self.do_write(op.fd, op.buffer as *const u8, op.length, op.offset),
        };

        self.pending_completion = Some(IoCompletion {
            slot: op.slot,
            result,
            kind: op.kind,
        });

        Ok(())
    }

    fn poll_completions(&mut self) -> Result<Vec<IoCompletion>> {
        Ok(self.pending_completion.take().into_iter().collect())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.pending_completion = None;
        Ok(())
    }
}
