//! Register block provider
//!
//! The provider owns one register block for its lifetime. Setup is two
//! explicit phases:
//!
//! ```text
//! allocate(staging)            zeroed page + header (magic, version, status=OK)
//!     │
//! register(name, registry)     publish under the stable name
//!     │  └─ rejected → backing memory released, staging file removed
//!     ▼
//! RegisterBlockProvider        write_telemetry / publish
//!     │
//! teardown()                   unregister + release (idempotent, never waits for readers)
//! ```
//!
//! The header is complete before the block has a public name, so no reader
//! can observe a half-written header.

use crate::config;
use crate::error::{Result, SensorError};
use crate::mmio::{BlockMemory, Header};
use crate::sample::Sample;
use simsensor_regs::{regs, TelemetryField};
use std::collections::HashMap;
use std::fmt::Debug;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// External mapping mechanism
///
/// Gives a backing file a stable, openable identity and later withdraws it.
pub trait Registry: Debug {
    /// Where the provider should create the backing file for `name`
    fn staging_path(&self, name: &str) -> PathBuf;

    /// Make `backing` reachable under `name`; returns the identity readers open
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Registration`] if the name is invalid or taken.
    fn register(&mut self, name: &str, backing: &Path) -> Result<PathBuf>;

    /// Withdraw a previously registered identity
    ///
    /// Readers that already mapped the block keep their mapping.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the identity exists but cannot be removed.
    fn unregister(&mut self, identity: &Path) -> Result<()>;
}

/// Registry publishing blocks as files in one directory (default `/dev/shm`)
///
/// Each registration remembers the `(dev, ino)` of the file it linked.
/// Unregistering removes the name only while it still points at that file.
#[derive(Debug, Clone)]
pub struct ShmRegistry {
    root: PathBuf,
    linked: HashMap<PathBuf, (u64, u64)>,
}

impl ShmRegistry {
    /// Registry rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            linked: HashMap::new(),
        }
    }

    /// Registry rooted at `$SIMSENSOR_SHM_DIR`, or `/dev/shm`
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(config::shm_dir())
    }

    /// Directory holding registered blocks
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.starts_with('.') || name.contains('/') {
            return Err(SensorError::registration(
                name,
                "name must be a non-empty file name not starting with '.'",
            ));
        }
        Ok(())
    }
}

impl Default for ShmRegistry {
    fn default() -> Self {
        Self::new(config::DEFAULT_SHM_DIR)
    }
}

impl Registry for ShmRegistry {
    fn staging_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!(".{name}.{}.staging", std::process::id()))
    }

    fn register(&mut self, name: &str, backing: &Path) -> Result<PathBuf> {
        Self::validate_name(name)?;

        let metadata =
            std::fs::metadata(backing).map_err(|e| SensorError::registration(name, e))?;

        let identity = self.root.join(name);
        std::fs::hard_link(backing, &identity).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SensorError::registration(name, format!("{} already registered", identity.display()))
            } else {
                SensorError::registration(name, e)
            }
        })?;

        self.linked
            .insert(identity.clone(), (metadata.dev(), metadata.ino()));

        tracing::debug!("Linked {} -> {}", backing.display(), identity.display());
        Ok(identity)
    }

    fn unregister(&mut self, identity: &Path) -> Result<()> {
        let linked = self.linked.remove(identity);

        let current = match std::fs::symlink_metadata(identity) {
            Ok(metadata) => (metadata.dev(), metadata.ino()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} already gone", identity.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if linked.is_some_and(|ours| ours != current) {
            tracing::warn!(
                "{} now belongs to another block; leaving it in place",
                identity.display()
            );
            return Ok(());
        }

        match std::fs::remove_file(identity) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Phase one: allocate a zeroed block at `staging` and write its header
///
/// # Errors
///
/// Returns [`SensorError::Allocation`] if the backing memory cannot be obtained.
pub fn allocate(staging: &Path) -> Result<BlockMemory> {
    let mut memory = BlockMemory::create(staging)?;

    memory.write_u32(regs::MAGIC, regs::MAGIC_VALUE);
    memory.write_u32(regs::VERSION, regs::VERSION_VALUE);
    memory.write_u32(regs::STATUS, regs::status::OK);

    Ok(memory)
}

/// Phase two: register `memory` under `name`
///
/// On rejection the memory is released before the error is returned.
///
/// # Errors
///
/// Returns the registry's [`SensorError::Registration`].
pub fn register<R: Registry>(
    name: &str,
    mut registry: R,
    mut memory: BlockMemory,
) -> Result<RegisterBlockProvider<R>> {
    let backing = memory
        .staging_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| SensorError::invalid_state("block memory has no backing file"))?;

    let identity = match registry.register(name, &backing) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("{name}: register failed: {e}");
            drop(memory);
            return Err(e);
        }
    };

    memory.detach_staging();

    tracing::info!(
        "{name}: registered {} size={}",
        identity.display(),
        simsensor_regs::block::SIZE
    );

    Ok(RegisterBlockProvider {
        name: name.to_owned(),
        registry,
        live: Some(Live { memory, identity }),
    })
}

#[derive(Debug)]
struct Live {
    memory: BlockMemory,
    identity: PathBuf,
}

/// Owner of one registered register block
///
/// Dropping the provider tears it down.
#[derive(Debug)]
pub struct RegisterBlockProvider<R: Registry = ShmRegistry> {
    name: String,
    registry: R,
    live: Option<Live>,
}

impl<R: Registry> RegisterBlockProvider<R> {
    /// Allocate, populate and register a block under `name`
    ///
    /// # Errors
    ///
    /// - [`SensorError::Allocation`] if backing memory cannot be obtained
    /// - [`SensorError::Registration`] if the registry rejects the block
    ///   (the allocation is rolled back first)
    pub fn initialize(name: &str, registry: R) -> Result<Self> {
        let memory = allocate(&registry.staging_path(name))?;
        register(name, registry, memory)
    }

    /// Stable name the block was registered under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity readers open, while registered
    #[must_use]
    pub fn identity(&self) -> Option<&Path> {
        self.live.as_ref().map(|l| l.identity.as_path())
    }

    /// True until [`teardown`](Self::teardown)
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.live.is_some()
    }

    /// Registry the block is published in
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Read back the header zone
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidState`] after teardown.
    pub fn header(&self) -> Result<Header> {
        Ok(self.live()?.memory.header())
    }

    /// Store one telemetry field
    ///
    /// Single volatile little-endian store; the header zone is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidState`] after teardown.
    pub fn write_telemetry(&mut self, field: TelemetryField, value: f32) -> Result<()> {
        let live = self.live_mut()?;
        tracing::trace!("{field} <- {value}");
        live.memory.write_field(field, value);
        Ok(())
    }

    /// Store all four telemetry fields, one independent store each
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidState`] after teardown.
    pub fn publish(&mut self, sample: &Sample) -> Result<()> {
        let live = self.live_mut()?;
        for field in TelemetryField::ALL {
            live.memory.write_field(field, sample.get(field));
        }
        Ok(())
    }

    /// Unregister the block and release its memory
    ///
    /// Does not wait for readers; their mappings stay valid until they close.
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if unregistering fails. The memory is
    /// released regardless.
    pub fn teardown(&mut self) -> Result<()> {
        let Some(live) = self.live.take() else {
            tracing::debug!("{}: already torn down", self.name);
            return Ok(());
        };

        let result = self.registry.unregister(&live.identity);
        drop(live.memory);

        tracing::info!("{}: unloaded", self.name);
        result
    }

    fn live(&self) -> Result<&Live> {
        self.live
            .as_ref()
            .ok_or_else(|| SensorError::invalid_state(format!("{} torn down", self.name)))
    }

    fn live_mut(&mut self) -> Result<&mut Live> {
        let name = &self.name;
        self.live
            .as_mut()
            .ok_or_else(|| SensorError::invalid_state(format!("{name} torn down")))
    }
}

impl<R: Registry> Drop for RegisterBlockProvider<R> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::error!("{}: teardown failed during drop: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shm_names_are_validated() {
        assert!(ShmRegistry::validate_name("sim_sensor.bin").is_ok());
        for bad in ["", ".hidden", "a/b"] {
            assert!(
                matches!(ShmRegistry::validate_name(bad), Err(SensorError::Registration { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn staging_path_is_hidden_and_per_process() {
        let reg = ShmRegistry::new("/dev/shm");
        let staging = reg.staging_path("sim_sensor.bin");
        let file_name = staging.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(file_name.starts_with(".sim_sensor.bin."));
        assert!(file_name.contains(&std::process::id().to_string()));
        assert_eq!(staging.parent(), Some(Path::new("/dev/shm")));
    }

    #[test]
    fn unregister_spares_a_replacement() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = ShmRegistry::new(dir.path());
        let backing = dir.path().join("backing");
        std::fs::write(&backing, b"ours").expect("write");

        let identity = reg.register("block", &backing).expect("register");
        std::fs::remove_file(&backing).expect("detach");

        // Removed behind our back, then taken by someone else
        std::fs::remove_file(&identity).expect("external remove");
        std::fs::write(&identity, b"theirs").expect("replace");

        reg.unregister(&identity).expect("unregister");
        assert_eq!(std::fs::read(&identity).expect("read"), b"theirs");
    }

    #[test]
    fn unregister_removes_own_link() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut reg = ShmRegistry::new(dir.path());
        let backing = dir.path().join("backing");
        std::fs::write(&backing, b"ours").expect("write");

        let identity = reg.register("block", &backing).expect("register");
        reg.unregister(&identity).expect("unregister");
        assert!(!identity.exists());
        reg.unregister(&identity).expect("second unregister");
    }

    #[test]
    fn allocate_writes_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let memory = allocate(&dir.path().join("staging")).expect("allocate");
        assert_eq!(memory.header(), Header::INITIAL);
        for field in TelemetryField::ALL {
            assert_eq!(memory.read_u32(field.offset()), 0);
        }
    }
}
