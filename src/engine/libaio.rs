//! Linux native AIO engine
//!
//! Asynchronous engine built on the kernel's native AIO interface
//! (io_setup/io_submit/io_getevents), invoked through raw syscalls so no
//! LGPL binding library is needed. One AIO context per worker thread holds
//! up to the configured queue depth of in-flight requests.
//!
//! `poll_completions` never blocks: io_getevents is called with a minimum
//! of zero events, so the executor's busy-poll loop stays in control. A
//! negative event result is the kernel's -errno and is surfaced as the
//! completion's error; partial completions are returned as-is for the
//! executor to judge.

use super::{EngineConfig, IoCompletion, IoEngine, IoRequest, OpKind};
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use std::mem::MaybeUninit;
use std::ptr;

type AioContext = libc::c_ulong;

const IOCB_CMD_PREAD: u16 = 0;
const IOCB_CMD_PWRITE: u16 = 1;

#[repr(C)]
#[derive(Clone, Copy)]
struct IoControlBlock {
    data: u64,          // User data (aio_data)
    key: u32,           // aio_key
    aio_rw_flags: u32,  // RWF_* flags
    lio_opcode: u16,    // Operation code
    aio_reqprio: i16,   // Request priority
    aio_fildes: u32,    // File descriptor
    buf: u64,           // Buffer pointer
    nbytes: u64,        // Number of bytes
    offset: i64,        // File offset
    aio_reserved2: u64, // Reserved
    flags: u32,         // IOCB_FLAG_* flags
    aio_resfd: u32,     // Eventfd for notification
}

#[repr(C)]
#[derive(Clone, Copy)]
struct IoEvent {
    data: u64, // User data from iocb
    obj: u64,  // Pointer to iocb
    res: i64,  // Result (bytes transferred or -errno)
    res2: i64, // Secondary result
}

// AIO syscall numbers for x86_64
const SYS_IO_SETUP: i64 = 206;
const SYS_IO_DESTROY: i64 = 207;
const SYS_IO_GETEVENTS: i64 = 208;
const SYS_IO_SUBMIT: i64 = 209;

unsafe fn io_setup(maxevents: libc::c_int, ctxp: *mut AioContext) -> libc::c_int {
    libc::syscall(SYS_IO_SETUP, maxevents as i64, ctxp) as libc::c_int
}

unsafe fn io_destroy(ctx: AioContext) -> libc::c_int {
    libc::syscall(SYS_IO_DESTROY, ctx) as libc::c_int
}

unsafe fn io_submit(
    ctx: AioContext,
    nr: libc::c_long,
    iocbpp: *mut *mut IoControlBlock,
) -> libc::c_int {
    libc::syscall(SYS_IO_SUBMIT, ctx, nr, iocbpp) as libc::c_int
}

unsafe fn io_getevents(
    ctx: AioContext,
    min_nr: libc::c_long,
    nr: libc::c_long,
    events: *mut IoEvent,
    timeout: *mut libc::timespec,
) -> libc::c_int {
    libc::syscall(SYS_IO_GETEVENTS, ctx, min_nr, nr, events, timeout) as libc::c_int
}

/// Linux native AIO engine.
pub struct LibaioEngine {
    /// AIO context, present after init
    ctx: Option<AioContext>,

    /// Queue depth from init
    queue_depth: usize,

    /// Pool of control blocks, one per possible in-flight request
    iocbs: Vec<IoControlBlock>,

    /// Free control block indices
    available_iocbs: Vec<usize>,

    /// slot tag -> (operation kind, control block index) for every
    /// submitted-but-not-completed request
    pending: HashMap<u64, (OpKind, usize)>,

    /// Event buffer reused across polls
    events: Vec<IoEvent>,
}

impl LibaioEngine {
    /// Create a new engine; `init` allocates the kernel context.
    pub fn new() -> Self {
        Self {
            ctx: None,
            queue_depth: 0,
            iocbs: Vec::new(),
            available_iocbs: Vec::new(),
            pending: HashMap::new(),
            events: Vec::new(),
        }
    }
}

impl Default for LibaioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IoEngine for LibaioEngine {
    fn init(&mut self, config: &EngineConfig) -> Result<()> {
        let mut ctx: AioContext = 0;
        let result = unsafe { io_setup(config.queue_depth as i32, &mut ctx) };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!(
                "io_setup failed with queue_depth={}",
                config.queue_depth
            ));
        }

        self.ctx = Some(ctx);
        self.queue_depth = config.queue_depth;

        self.iocbs = vec![unsafe { MaybeUninit::zeroed().assume_init() }; config.queue_depth];
        self.available_iocbs = (0..config.queue_depth).collect();
        self.events = vec![unsafe { MaybeUninit::zeroed().assume_init() }; config.queue_depth];

        Ok(())
    }

    fn submit(&mut self, op: IoRequest) -> Result<()> {
        let ctx = self
            .ctx
            .ok_or_else(|| anyhow::anyhow!("engine not initialized"))?;

        let iocb_idx = self
            .available_iocbs
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no free control blocks (queue full)"))?;

        let iocb = &mut self.iocbs[iocb_idx];
        *iocb = IoControlBlock {
            data: op.slot,
            key: 0,
            aio_rw_flags: 0,
            lio_opcode: match op.kind {
                OpKind::Read => IOCB_CMD_PREAD,
                OpKind::Write => IOCB_CMD_PWRITE,
            },
            aio_reqprio: 0,
            aio_fildes: op.fd as u32,
            buf: op.buffer as u64,
            nbytes: op.length as u64,
            offset: op.offset as i64,
            aio_reserved2: 0,
            flags: 0,
            aio_resfd: 0,
        };

        let mut iocb_ptr = iocb as *mut IoControlBlock;
        // SAFETY: the context is live and the iocb stays allocated in the
        // pool until its completion event has been consumed.
        let result = unsafe { io_submit(ctx, 1, &mut iocb_ptr) };

        if result < 0 {
            self.available_iocbs.push(iocb_idx);

            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("io_submit failed for {} operation", op.kind));
        }

        self.pending.insert(op.slot, (op.kind, iocb_idx));
        Ok(())
    }

    fn poll_completions(&mut self) -> Result<Vec<IoCompletion>> {
        let ctx = self
            .ctx
            .ok_or_else(|| anyhow::anyhow!("engine not initialized"))?;

        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        // min_nr = 0 keeps this non-blocking; the executor spins.
        let result = unsafe {
            io_getevents(
                ctx,
                0,
                self.queue_depth as i64,
                self.events.as_mut_ptr(),
                ptr::null_mut(),
            )
        };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context("io_getevents failed");
        }

        let num_events = result as usize;
        let mut completions = Vec::with_capacity(num_events);

        for event in &self.events[..num_events] {
            let slot = event.data;
            let (kind, iocb_idx) = self
                .pending
                .remove(&slot)
                .ok_or_else(|| anyhow::anyhow!("completion for unknown request tag {}", slot))?;
            self.available_iocbs.push(iocb_idx);

            let result = if event.res >= 0 {
                Ok(event.res as usize)
            } else {
                let errno = (-event.res) as i32;
                Err(std::io::Error::from_raw_os_error(errno))
                    .context(format!("{} operation failed: errno={}", kind, errno))
            };

            completions.push(IoCompletion { slot, result, kind });
        }

        Ok(completions)
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(ctx) = self.ctx {
            // Drain whatever is still in flight before tearing down
            while !self.pending.is_empty() {
                let _ = self.poll_completions();
            }

            let result = unsafe { io_destroy(ctx) };
            if result < 0 {
                let err = std::io::Error::last_os_error();
                return Err(err).context("io_destroy failed");
            }

            self.ctx = None;
        }

        self.pending.clear();
        self.available_iocbs.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::os::unix::io::AsRawFd;
    use tempfile::TempDir;

    fn poll_until_complete(engine: &mut LibaioEngine, expected: usize) -> Vec<IoCompletion> {
        let mut completions = Vec::new();
        while completions.len() < expected {
            completions.extend(engine.poll_completions().unwrap());
        }
        completions
    }

    #[test]
    fn test_libaio_init_cleanup() {
        let mut engine = LibaioEngine::new();
        let config = EngineConfig { queue_depth: 32 };

        assert!(engine.init(&config).is_ok());
        assert!(engine.cleanup().is_ok());
    }

    #[test]
    fn test_libaio_read() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("read.dat");

        let mut test_data = vec![0u8; 4096];
        let message = b"native AIO read round trip";
        test_data[..message.len()].copy_from_slice(message);
        std::fs::write(&file_path, &test_data).unwrap();

        let file = File::open(&file_path).unwrap();
        let fd = file.as_raw_fd();

        let mut engine = LibaioEngine::new();
        engine.init(&EngineConfig { queue_depth: 4 }).unwrap();

        let mut buffer = vec![0u8; 4096];
        let op = IoRequest {
            kind: OpKind::Read,
            fd,
            offset: 0,
            buffer: buffer.as_mut_ptr(),
            length: 4096,
            slot: 42,
        };

        engine.submit(op).unwrap();

        let completions = poll_until_complete(&mut engine, 1);
        assert_eq!(completions[0].slot, 42);
        assert_eq!(completions[0].kind, OpKind::Read);
        assert_eq!(*completions[0].result.as_ref().unwrap(), 4096);
        assert_eq!(&buffer[..message.len()], message);

        engine.cleanup().unwrap();
    }

    #[test]
    fn test_libaio_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("write.dat");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&file_path)
            .unwrap();
        let fd = file.as_raw_fd();

        let mut engine = LibaioEngine::new();
        engine.init(&EngineConfig { queue_depth: 4 }).unwrap();

        let mut buffer = vec![0u8; 4096];
        let message = b"native AIO write round trip";
        buffer[..message.len()].copy_from_slice(message);

        let op = IoRequest {
            kind: OpKind::Write,
            fd,
            offset: 0,
            buffer: buffer.as_mut_ptr(),
            length: 4096,
            slot: 7,
        };

        engine.submit(op).unwrap();

        let completions = poll_until_complete(&mut engine, 1);
        assert_eq!(completions[0].kind, OpKind::Write);
        assert_eq!(*completions[0].result.as_ref().unwrap(), 4096);

        engine.cleanup().unwrap();
        drop(file);

        let written = std::fs::read(&file_path).unwrap();
        assert_eq!(&written[..message.len()], message);
    }

    #[test]
    fn test_libaio_multiple_in_flight() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("multi.dat");

        let test_data: Vec<u8> = (0..20480).map(|i| (i % 256) as u8).collect();
        std::fs::write(&file_path, &test_data).unwrap();

        let file = File::open(&file_path).unwrap();
        let fd = file.as_raw_fd();

        let mut engine = LibaioEngine::new();
        engine.init(&EngineConfig { queue_depth: 8 }).unwrap();

        let mut buffers = vec![vec![0u8; 4096]; 5];
        for (i, buffer) in buffers.iter_mut().enumerate() {
            let op = IoRequest {
                kind: OpKind::Read,
                fd,
                offset: (i * 4096) as u64,
                buffer: buffer.as_mut_ptr(),
                length: 4096,
                slot: i as u64,
            };
            engine.submit(op).unwrap();
        }

        let completions = poll_until_complete(&mut engine, 5);
        assert_eq!(completions.len(), 5);
        for completion in &completions {
            assert!(completion.result.is_ok());
        }

        for (i, buffer) in buffers.iter().enumerate() {
            for (j, &byte) in buffer.iter().enumerate() {
                assert_eq!(byte, ((i * 4096 + j) % 256) as u8);
            }
        }

        engine.cleanup().unwrap();
    }

    #[test]
    fn test_libaio_invalid_fd_rejected_at_submit() {
        let mut engine = LibaioEngine::new();
        engine.init(&EngineConfig { queue_depth: 4 }).unwrap();

        let mut buffer = vec![0u8; 4096];
        let op = IoRequest {
            kind: OpKind::Read,
            fd: -1,
            offset: 0,
            buffer: buffer.as_mut_ptr(),
            length: buffer.len(),
            slot: 1,
        };

        assert!(engine.submit(op).is_err());

        engine.cleanup().unwrap();
    }

    #[test]
    fn test_libaio_queue_full() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("full.dat");
        std::fs::write(&file_path, vec![0u8; 8192]).unwrap();

        let file = File::open(&file_path).unwrap();
        let fd = file.as_raw_fd();

        let mut engine = LibaioEngine::new();
        engine.init(&EngineConfig { queue_depth: 2 }).unwrap();

        let mut buffers = vec![vec![0u8; 4096]; 3];
        let mut submitted = 0;
        for (i, buffer) in buffers.iter_mut().enumerate() {
            let op = IoRequest {
                kind: OpKind::Read,
                fd,
                offset: 0,
                buffer: buffer.as_mut_ptr(),
                length: 4096,
                slot: i as u64,
            };
            if engine.submit(op).is_ok() {
                submitted += 1;
            }
        }

        // Third submission exceeds the control block pool
        assert_eq!(submitted, 2);

        poll_until_complete(&mut engine, 2);
        engine.cleanup().unwrap();
    }
}
