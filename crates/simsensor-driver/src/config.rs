//! Defaults and environment overrides
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `SIMSENSOR_SHM_DIR` | directory of the shared-memory registry | `/dev/shm` |
//! | `SIMSENSOR_CHECK_HEADER` | reader refuses blocks with a bad header | off |

use crate::resolve;
use std::path::PathBuf;
use std::time::Duration;

/// Reader identity when none is given
pub const DEFAULT_UIO: &str = "/dev/uio0";
/// Shared-memory registry directory
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";
/// Name the simulator registers by default
pub const DEFAULT_BLOCK_NAME: &str = "sim_sensor.bin";
/// Pause after each reader sample
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
/// Samples per reader run
pub const DEFAULT_COUNT: usize = 20;
/// Simulator update rate
pub const DEFAULT_RATE_HZ: f64 = 100.0;

/// Overrides the registry directory
pub const SHM_DIR_ENV: &str = "SIMSENSOR_SHM_DIR";
/// Enables header validation in the reader
pub const CHECK_HEADER_ENV: &str = "SIMSENSOR_CHECK_HEADER";

/// Registry directory from the environment
#[must_use]
pub fn shm_dir() -> PathBuf {
    std::env::var_os(SHM_DIR_ENV).map_or_else(|| PathBuf::from(DEFAULT_SHM_DIR), PathBuf::from)
}

/// Interpret a boolean environment value
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Reader settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Identity to open (path, `uioN`, or registry name)
    pub identity: String,
    /// Pause after each sample
    pub interval: Duration,
    /// Number of samples
    pub count: usize,
    /// Refuse blocks whose header is not valid
    pub check_header: bool,
    /// Registry directory for bare names
    pub shm_dir: PathBuf,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_UIO.to_owned(),
            interval: DEFAULT_INTERVAL,
            count: DEFAULT_COUNT,
            check_header: false,
            shm_dir: PathBuf::from(DEFAULT_SHM_DIR),
        }
    }
}

impl ReaderConfig {
    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            check_header: std::env::var(CHECK_HEADER_ENV).is_ok_and(|v| parse_flag(&v)),
            shm_dir: shm_dir(),
            ..Self::default()
        }
    }

    /// Replace the identity
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Path the identity resolves to
    #[must_use]
    pub fn path(&self) -> PathBuf {
        resolve::resolve_identity(&self.identity, &self.shm_dir)
    }
}
