//! Identity resolution
//!
//! Turns a reader identity into a path and finds the size of the region
//! behind it. Two kinds of resource are accepted:
//!
//! - a regular file (shared-memory registry entry), sized by its length
//! - a UIO character device (`/dev/uioN`), sized by sysfs
//!   `/sys/class/uio/uioN/maps/map0/size`

use crate::error::{Result, SensorError};
use std::fs::File;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

/// sysfs root for UIO devices
pub const UIO_SYSFS_ROOT: &str = "/sys/class/uio";

/// Resolve an identity to a path
///
/// - anything containing `/` is used as a path
/// - `uioN` maps to `/dev/uioN`
/// - any other bare name is looked up inside `shm_dir`
#[must_use]
pub fn resolve_identity(identity: &str, shm_dir: &Path) -> PathBuf {
    if identity.contains('/') {
        PathBuf::from(identity)
    } else if uio_index(identity).is_some() {
        Path::new("/dev").join(identity)
    } else {
        shm_dir.join(identity)
    }
}

/// Index of a `uioN` device name
#[must_use]
pub fn uio_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("uio")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Size in bytes of the region `path` refers to
///
/// # Errors
///
/// Returns [`SensorError::NotFound`] if `path` is neither a regular file nor a
/// UIO device with a first memory map.
pub fn region_size(path: &Path, file: &File) -> Result<u64> {
    let metadata = file.metadata()?;
    let file_type = metadata.file_type();

    if file_type.is_file() {
        return Ok(metadata.len());
    }

    if file_type.is_char_device() {
        return device_map_size(path, Path::new(UIO_SYSFS_ROOT));
    }

    tracing::debug!("{} is not a file or character device", path.display());
    Err(SensorError::not_found(path))
}

/// Map 0 size of the UIO device at `path`, following symlinks such as udev aliases
fn device_map_size(path: &Path, sysfs_root: &Path) -> Result<u64> {
    let device = std::fs::canonicalize(path).map_err(|e| SensorError::from_open(path, e))?;
    let name = device
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SensorError::not_found(path))?;
    uio_map_size(sysfs_root, name)
}

/// Size of memory map 0 of UIO device `name` under `sysfs_root`
///
/// # Errors
///
/// Returns [`SensorError::NotFound`] if the attribute is missing or unparsable.
pub fn uio_map_size(sysfs_root: &Path, name: &str) -> Result<u64> {
    let attr = sysfs_root.join(name).join("maps/map0/size");
    let size = read_hex_sysfs(&attr).ok_or_else(|| SensorError::not_found(&attr))?;

    tracing::debug!("{name}: map0 size={size:#x}");
    Ok(size)
}

/// Read a hexadecimal value from sysfs
fn read_hex_sysfs(path: &Path) -> Option<u64> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim().trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).ok()
}
