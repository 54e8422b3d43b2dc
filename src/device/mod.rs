//! Device handling
//!
//! A [`Device`] wraps an open file descriptor for a file or block device.
//! The coordinator opens every device once before any worker starts; the
//! descriptors are then shared read-only across all worker threads. That is
//! safe because every transfer is positioned (pread/pwrite or AIO with an
//! explicit offset) and never touches the shared file cursor.
//!
//! [`probe_size`] determines the usable size of a target when the access
//! range was not given explicitly: `fstat` for regular files, the
//! BLKGETSIZE64 ioctl for block and character devices on Linux.

use crate::config::Direction;
use crate::Result;
use anyhow::Context;
use std::fs::OpenOptions;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;

// ioctl request code for the 64-bit block device size
#[cfg(target_os = "linux")]
const BLKGETSIZE64: libc::c_ulong = 0x80081272;

/// An open device or file target.
///
/// The descriptor is owned by this struct and closed on drop. The struct is
/// never mutated after `open`, so sharing it across threads needs no
/// synchronization.
#[derive(Debug)]
pub struct Device {
    path: PathBuf,
    fd: RawFd,
}

impl Device {
    /// Open a device or file for the run.
    ///
    /// Read runs open read-only, write runs write-only, matching the
    /// direction of every transfer the workers will issue. `direct` and
    /// `sync` map to O_DIRECT and O_SYNC on Linux and are ignored elsewhere.
    pub fn open(path: &Path, direction: Direction, direct: bool, sync: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        match direction {
            Direction::Read => options.read(true),
            Direction::Write => options.write(true),
        };

        #[cfg(target_os = "linux")]
        {
            let mut custom_flags = 0;
            if direct {
                custom_flags |= libc::O_DIRECT;
            }
            if sync {
                custom_flags |= libc::O_SYNC;
            }
            if custom_flags != 0 {
                options.custom_flags(custom_flags);
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (direct, sync);
        }

        let file = options
            .open(path)
            .with_context(|| format!("Failed to open device: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            fd: file.into_raw_fd(),
        })
    }

    /// File descriptor for positioned I/O
    #[inline(always)]
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Path this device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // SAFETY: fd was obtained from into_raw_fd and is owned exclusively
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// Determine the size of a device or file in bytes.
///
/// Regular files report their stat size. Block and character devices report
/// the BLKGETSIZE64 ioctl result on Linux. Anything else is an error: the
/// caller must then supply the access range explicitly.
pub fn probe_size(path: &Path) -> Result<u64> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {} for size probe", path.display()))?;
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(&file);

    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: fd is valid for the lifetime of `file`, stat is a plain struct
    let result = unsafe { libc::fstat(fd, &mut stat) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).context(format!("fstat failed: {}", path.display()));
    }

    let mode = stat.st_mode & libc::S_IFMT;

    if mode == libc::S_IFREG {
        return Ok(stat.st_size as u64);
    }

    #[cfg(target_os = "linux")]
    if mode == libc::S_IFBLK || mode == libc::S_IFCHR {
        let mut size: u64 = 0;
        // SAFETY: BLKGETSIZE64 writes a u64 through the pointer
        let result = unsafe { libc::ioctl(fd, BLKGETSIZE64, &mut size) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!(
                "ioctl(BLKGETSIZE64) failed: {}",
                path.display()
            ));
        }
        return Ok(size);
    }

    anyhow::bail!("{} is not a regular file or block device", path.display())
}
