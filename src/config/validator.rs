//! Configuration validation and range resolution
//!
//! All checks here run before any device is opened for I/O and before any
//! worker starts. The size probe opens targets read-only and only when the
//! end of the access range was left unset.

use super::{Config, ConfigError, AccessPattern, MAX_CONCURRENCY, MAX_DEVICES, MAX_THREADS};
use crate::device;

/// Validate a configuration and resolve the open parts of the access range.
///
/// Order follows the original tool: structural checks first, then the size
/// probe (only if `-e` was absent), then the range check and the sequential
/// count default.
pub fn resolve_and_validate(config: &mut Config) -> Result<(), ConfigError> {
    validate_limits(config)?;

    if config.end_block == 0 {
        resolve_end_from_probe(config)?;
    }

    if config.start_block > config.end_block {
        return Err(ConfigError::InvertedRange {
            start: config.start_block,
            end: config.end_block,
        });
    }

    if config.pattern == AccessPattern::Sequential {
        if config.ops_per_thread == 0 {
            config.ops_per_thread = config.block_count();
        }
        if config.ops_per_thread > config.block_count() {
            return Err(ConfigError::CountExceedsRange {
                count: config.ops_per_thread,
                range: config.block_count(),
            });
        }
    }

    Ok(())
}

/// Structural checks that need no I/O
fn validate_limits(config: &Config) -> Result<(), ConfigError> {
    if config.devices.is_empty() {
        return Err(ConfigError::NoDevices);
    }
    if config.block_size == 0 {
        return Err(ConfigError::BlockSizeZero);
    }
    if config.threads > MAX_THREADS {
        return Err(ConfigError::ThreadLimit(config.threads));
    }
    if config.devices.len() > MAX_DEVICES {
        return Err(ConfigError::DeviceLimit(config.devices.len()));
    }
    if config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::ConcurrencyLimit(config.concurrency));
    }
    if config.is_async() && !cfg!(target_os = "linux") {
        return Err(ConfigError::AsyncUnavailable);
    }

    Ok(())
}

/// Probe device sizes and derive the end of the access range.
///
/// Every device must report the same size when the range is probed; runs
/// over devices of different sizes require an explicit `-s`/`-e` range.
fn resolve_end_from_probe(config: &mut Config) -> Result<(), ConfigError> {
    let first = &config.devices[0];
    let size = device::probe_size(first).map_err(|source| ConfigError::SizeProbe {
        path: first.clone(),
        source,
    })?;

    for path in &config.devices[1..] {
        let other = device::probe_size(path).map_err(|source| ConfigError::SizeProbe {
            path: path.clone(),
            source,
        })?;
        if other != size {
            return Err(ConfigError::MismatchedDeviceSizes {
                path: path.clone(),
                size: other,
                expected: size,
            });
        }
    }

    config.end_block = size / config.block_size as u64;
    Ok(())
}
