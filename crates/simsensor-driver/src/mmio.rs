//! Memory-mapped access to the register block
//!
//! Two views over the same 4 KB page:
//!
//! - [`RegisterView`] — read-only mapping held by a reader.
//! - [`BlockMemory`] — read-write mapping held by the provider.
//!
//! Every register access is a single naturally aligned volatile load or store.
//! Nothing here synchronizes with the other side of the mapping: a reader may
//! observe fields from two different provider update cycles.

// Register offsets are 4-byte aligned inside a page-aligned mapping
#![allow(clippy::cast_ptr_alignment)]

use crate::error::{Result, SensorError};
use crate::resolve;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use simsensor_regs::{block, regs, TelemetryField, Version};
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Block size as a file length.
const BLOCK_LEN: u64 = block::SIZE as u64;

/// Header zone snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Identity tag.
    pub magic: u32,
    /// Block version.
    pub version: Version,
    /// Status word; nonzero means ready.
    pub status: u32,
}

impl Header {
    /// Header a freshly initialized provider writes.
    pub const INITIAL: Self = Self {
        magic: regs::MAGIC_VALUE,
        version: Version::unpack(regs::VERSION_VALUE),
        status: regs::status::OK,
    };

    /// True if the magic matches and the status reports ready.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == regs::MAGIC_VALUE && regs::status::is_ready(self.status)
    }
}

/// One mapped register page.
struct Mapping {
    ptr: NonNull<u8>,
    mapped: bool,
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("mapped", &self.mapped)
            .finish()
    }
}

impl Mapping {
    fn map(file: &File, prot: ProtFlags) -> std::io::Result<Self> {
        // SAFETY: mmap of one page of a file we hold open.
        // Invariants: (1) fd valid for the duration of the call; (2) the caller checked
        // the resource is exactly block::SIZE bytes; (3) offset 0 is page aligned;
        // (4) MAP_SHARED so provider stores are visible to every reader mapping.
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                block::SIZE,
                prot,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )?
        };

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| std::io::Error::other("mmap returned a null pointer"))?;

        Ok(Self { ptr, mapped: true })
    }

    fn load(&self, offset: usize) -> u32 {
        assert!(
            block::contains(offset, block::REGISTER_WIDTH) && block::is_aligned(offset),
            "Register offset {offset:#x} out of bounds or misaligned"
        );
        // SAFETY: read_volatile necessary - the other side of the mapping can change the value.
        // Invariants: (1) ptr from mmap, valid for block::SIZE bytes while mapped; (2) offset+4
        // <= SIZE and 4-byte aligned (asserted); (3) unmap only happens in close/drop, which
        // consume the owner, so no load follows it.
        let raw = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        u32::from_le(raw)
    }

    fn store(&self, offset: usize, value: u32) {
        assert!(
            block::contains(offset, block::REGISTER_WIDTH) && block::is_aligned(offset),
            "Register offset {offset:#x} out of bounds or misaligned"
        );
        // SAFETY: write_volatile so the store is never elided or merged.
        // Invariants: (1) ptr from a PROT_WRITE mapping (only BlockMemory calls store);
        // (2) offset+4 <= SIZE and aligned (asserted); (3) mapping still live.
        unsafe {
            self.ptr
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value.to_le());
        }
    }

    fn unmap(&mut self) -> std::io::Result<()> {
        if !self.mapped {
            return Ok(());
        }
        self.mapped = false;
        // SAFETY: ptr/len are exactly what mmap returned; mapped flag guarantees one munmap.
        unsafe { munmap(self.ptr.as_ptr().cast(), block::SIZE)? };
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            tracing::error!("munmap failed during drop: {e}");
        }
    }
}

// SAFETY: Send - the mapping is process-wide; moving the owner between threads does not
// invalidate it. Sync - loads take &self and are single volatile accesses; stores are only
// reachable through &mut BlockMemory.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

fn checked(offset: usize) -> Result<usize> {
    if block::contains(offset, block::REGISTER_WIDTH) && block::is_aligned(offset) {
        Ok(offset)
    } else {
        Err(SensorError::OutOfBounds {
            offset,
            width: block::REGISTER_WIDTH,
        })
    }
}

fn check_size(path: &Path, file: &File) -> Result<()> {
    let size = resolve::region_size(path, file)?;
    if size != BLOCK_LEN {
        return Err(SensorError::Size {
            path: path.to_path_buf(),
            expected: BLOCK_LEN,
            actual: size,
        });
    }
    Ok(())
}

/// Read-only view of a register block
///
/// Named getters cover the documented registers; [`read_u32`](Self::read_u32)
/// and [`read_f32`](Self::read_f32) give checked access to any other offset.
/// The mapping is released by [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct RegisterView {
    map: Mapping,
    path: PathBuf,
    _file: File,
}

impl RegisterView {
    /// Map the register block at `path` read-only
    ///
    /// # Errors
    ///
    /// - [`SensorError::NotFound`] if `path` does not resolve to a mappable resource
    /// - [`SensorError::Access`] if read permission is denied
    /// - [`SensorError::Size`] if the resource is not exactly one block in size
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!("Opening register block: {}", path.display());

        let file = File::open(path).map_err(|e| SensorError::from_open(path, e))?;
        check_size(path, &file)?;

        let map = Mapping::map(&file, ProtFlags::READ).map_err(|e| SensorError::from_open(path, e))?;

        tracing::info!("Mapped {} read-only at {:p}", path.display(), map.ptr);

        Ok(Self {
            map,
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Path the view was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped size; always one block
    #[must_use]
    pub const fn size(&self) -> usize {
        block::SIZE
    }

    /// Magic register
    pub fn magic(&self) -> u32 {
        self.map.load(regs::MAGIC)
    }

    /// Version register
    pub fn version(&self) -> Version {
        Version::unpack(self.map.load(regs::VERSION))
    }

    /// Status register
    pub fn status(&self) -> u32 {
        self.map.load(regs::STATUS)
    }

    /// Snapshot of the header zone (three independent loads)
    pub fn header(&self) -> Header {
        Header {
            magic: self.magic(),
            version: self.version(),
            status: self.status(),
        }
    }

    /// Accelerometer X
    pub fn accel_x(&self) -> f32 {
        self.field(TelemetryField::AccelX)
    }

    /// Accelerometer Y
    pub fn accel_y(&self) -> f32 {
        self.field(TelemetryField::AccelY)
    }

    /// Accelerometer Z
    pub fn accel_z(&self) -> f32 {
        self.field(TelemetryField::AccelZ)
    }

    /// Airspeed
    pub fn airspeed(&self) -> f32 {
        self.field(TelemetryField::Airspeed)
    }

    /// Load one telemetry field
    pub fn field(&self, field: TelemetryField) -> f32 {
        f32::from_bits(self.map.load(field.offset()))
    }

    /// Read a 32-bit register at an arbitrary offset
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::OutOfBounds`] if the access leaves the block or is misaligned.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let value = self.map.load(checked(offset)?);
        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    /// Read an f32 register at an arbitrary offset
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::OutOfBounds`] if the access leaves the block or is misaligned.
    pub fn read_f32(&self, offset: usize) -> Result<f32> {
        self.read_u32(offset).map(f32::from_bits)
    }

    /// Release the mapping
    ///
    /// # Errors
    ///
    /// Returns an error if `munmap` fails; the view is consumed either way.
    pub fn close(mut self) -> Result<()> {
        self.map.unmap()?;
        tracing::debug!("Unmapped {}", self.path.display());
        Ok(())
    }
}

/// Read-write backing memory owned by the provider
///
/// Created as a zero-filled file of exactly one block and mapped shared.
/// While a staging path is attached, dropping the memory removes that file,
/// so a failed setup never leaves a backing file behind.
///
/// [`attach`](Self::attach) maps a block some other provider owns instead;
/// dropping that memory only unmaps it.
#[derive(Debug)]
pub struct BlockMemory {
    map: Mapping,
    path: PathBuf,
    staging: Option<PathBuf>,
    _file: File,
}

impl BlockMemory {
    /// Create and map a zeroed block at `path`
    ///
    /// The file is created exclusively with mode `0644`: readers get read-only access.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Allocation`] if the file cannot be created, sized or mapped.
    pub fn create(path: &Path) -> Result<Self> {
        tracing::debug!("Allocating register block: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(0o644)
            .open(path)
            .map_err(|e| SensorError::allocation(path, e))?;

        let map = match file
            .set_len(BLOCK_LEN)
            .and_then(|()| Mapping::map(&file, ProtFlags::READ | ProtFlags::WRITE))
        {
            Ok(map) => map,
            Err(e) => {
                if let Err(rm) = fs::remove_file(path) {
                    tracing::warn!("Cannot remove {}: {rm}", path.display());
                }
                return Err(SensorError::allocation(path, e));
            }
        };

        tracing::debug!("Allocated {} bytes at {:p}", block::SIZE, map.ptr);

        Ok(Self {
            map,
            path: path.to_path_buf(),
            staging: Some(path.to_path_buf()),
            _file: file,
        })
    }

    /// Map an existing block at `path` read-write
    ///
    /// Nothing is created, resized or zeroed, and the header stays as its
    /// owner wrote it. Only telemetry stores go through this memory.
    ///
    /// # Errors
    ///
    /// - [`SensorError::NotFound`] if `path` does not resolve to a mappable resource
    /// - [`SensorError::Access`] if read-write access is denied
    /// - [`SensorError::Size`] if the resource is not exactly one block in size
    pub fn attach(path: &Path) -> Result<Self> {
        tracing::debug!("Attaching to register block: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| SensorError::from_open(path, e))?;
        check_size(path, &file)?;

        let map = Mapping::map(&file, ProtFlags::READ | ProtFlags::WRITE)
            .map_err(|e| SensorError::from_open(path, e))?;

        tracing::info!("Mapped {} read-write at {:p}", path.display(), map.ptr);

        Ok(Self {
            map,
            path: path.to_path_buf(),
            staging: None,
            _file: file,
        })
    }

    /// Path the memory was created or attached at
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staging file still owned by this memory, if any
    #[must_use]
    pub fn staging_path(&self) -> Option<&Path> {
        self.staging.as_deref()
    }

    /// Remove the staging file name; the mapping stays valid
    ///
    /// Called once the block is reachable under another name.
    pub(crate) fn detach_staging(&mut self) {
        if let Some(path) = self.staging.take() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Cannot remove staging file {}: {e}", path.display());
            }
        }
    }

    /// Write a 32-bit register
    pub(crate) fn write_u32(&mut self, offset: usize, value: u32) {
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        self.map.store(offset, value);
    }

    /// Write one telemetry field
    pub(crate) fn write_field(&mut self, field: TelemetryField, value: f32) {
        self.map.store(field.offset(), value.to_bits());
    }

    /// Read back a 32-bit register
    pub(crate) fn read_u32(&self, offset: usize) -> u32 {
        self.map.load(offset)
    }

    /// Read back the header zone
    pub(crate) fn header(&self) -> Header {
        Header {
            magic: self.read_u32(regs::MAGIC),
            version: Version::unpack(self.read_u32(regs::VERSION)),
            status: self.read_u32(regs::STATUS),
        }
    }
}

impl Drop for BlockMemory {
    fn drop(&mut self) {
        if let Err(e) = self.map.unmap() {
            tracing::error!("munmap failed during drop: {e}");
        }
        self.detach_staging();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_offsets() {
        assert!(checked(regs::AIRSPEED).is_ok());
        assert!(checked(block::SIZE - 4).is_ok());
        assert!(matches!(
            checked(block::SIZE),
            Err(SensorError::OutOfBounds { offset, width: 4 }) if offset == block::SIZE
        ));
        assert!(checked(0x11).is_err());
    }

    #[test]
    fn initial_header_is_valid() {
        assert!(Header::INITIAL.is_valid());
        assert_eq!(Header::INITIAL.version, Version::new(1, 0));

        let zeroed = Header {
            magic: 0,
            version: Version::new(0, 0),
            status: 0,
        };
        assert!(!zeroed.is_valid());
    }

    #[test]
    fn create_writes_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("block");

        let mut mem = BlockMemory::create(&path).expect("create");
        assert_eq!(std::fs::metadata(&path).expect("stat").len(), BLOCK_LEN);
        assert_eq!(mem.read_u32(regs::MAGIC), 0);

        mem.write_u32(regs::MAGIC, regs::MAGIC_VALUE);
        mem.write_field(TelemetryField::AccelZ, -9.807);
        assert_eq!(mem.read_u32(regs::MAGIC), regs::MAGIC_VALUE);
        assert_eq!(f32::from_bits(mem.read_u32(regs::ACCEL_Z)), -9.807);

        // Little-endian on disk regardless of host order
        let bytes = std::fs::read(&path).expect("read");
        assert_eq!(&bytes[0..4], &regs::MAGIC_VALUE.to_le_bytes());
        assert_eq!(&bytes[0x18..0x1c], &(-9.807f32).to_le_bytes());

        drop(mem);
        assert!(!path.exists(), "staging file removed on drop");
    }

    #[test]
    fn create_is_exclusive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("block");
        std::fs::write(&path, b"taken").expect("write");

        let err = BlockMemory::create(&path).unwrap_err();
        assert!(matches!(err, SensorError::Allocation { .. }));
        assert!(path.exists(), "existing file left alone");
    }

    #[test]
    fn attach_writes_only_telemetry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("owned");
        let original = vec![0xA5u8; block::SIZE];
        std::fs::write(&path, &original).expect("write");

        let mut mem = BlockMemory::attach(&path).expect("attach");
        assert_eq!(mem.path(), path.as_path());
        assert!(mem.staging_path().is_none());
        assert_eq!(mem.read_u32(regs::MAGIC), 0xA5A5_A5A5);

        for field in TelemetryField::ALL {
            mem.write_field(field, 1.5);
        }
        drop(mem);
        assert!(path.exists(), "attached block is not removed");

        let bytes = std::fs::read(&path).expect("read");
        for (offset, (&now, &before)) in bytes.iter().zip(&original).enumerate() {
            let in_field = TelemetryField::ALL
                .iter()
                .any(|f| (f.offset()..f.offset() + 4).contains(&offset));
            if in_field {
                continue;
            }
            assert_eq!(now, before, "byte {offset:#x} changed");
        }
        for field in TelemetryField::ALL {
            let o = field.offset();
            assert_eq!(&bytes[o..o + 4], &1.5f32.to_le_bytes(), "{field}");
        }
    }

    #[test]
    fn attach_checks_size_and_existence() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            BlockMemory::attach(&dir.path().join("absent")),
            Err(SensorError::NotFound { .. })
        ));

        let short = dir.path().join("short");
        std::fs::write(&short, [0u8; 10]).expect("write");
        assert!(matches!(
            BlockMemory::attach(&short),
            Err(SensorError::Size { actual: 10, .. })
        ));
    }
}
