//! Error types for register block operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for register block operations
pub type Result<T> = std::result::Result<T, SensorError>;

/// Errors that can occur while setting up, mapping or validating a register block
#[derive(Debug, Error)]
pub enum SensorError {
    /// The provider could not obtain backing memory for the block
    #[error("Cannot allocate register block at {path}: {reason}")]
    Allocation {
        /// Backing file that was being created
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// The mapping mechanism rejected the block
    #[error("Cannot register block {name:?}: {reason}")]
    Registration {
        /// Stable name under which registration was attempted
        name: String,
        /// Reason for failure
        reason: String,
    },

    /// The identity does not resolve to a mappable resource
    #[error("Register block not found: {path}")]
    NotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// Read permission was denied
    #[error("Access denied: {path}")]
    Access {
        /// Path that was opened
        path: PathBuf,
    },

    /// The resolved resource is not exactly one register block in size
    #[error("Register block {path} has size {actual}, expected {expected}")]
    Size {
        /// Path that was opened
        path: PathBuf,
        /// Required size in bytes
        expected: u64,
        /// Size reported by the resource
        actual: u64,
    },

    /// Header does not identify a ready register block
    #[error("Protocol mismatch: magic={magic:#010x} status={status:#x}")]
    ProtocolMismatch {
        /// Magic register contents
        magic: u32,
        /// Status register contents
        status: u32,
    },

    /// Register access outside the block or misaligned
    #[error("Invalid register access: offset={offset:#x}, width={width}")]
    OutOfBounds {
        /// Requested offset
        offset: usize,
        /// Access width in bytes
        width: usize,
    },

    /// Provider is in an invalid state for the operation
    #[error("Provider in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// I/O error while resolving or mapping the block
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl SensorError {
    /// Create an allocation error
    pub fn allocation(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Allocation {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a registration error
    pub fn registration(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Registration {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an access denied error
    pub fn access(path: impl Into<PathBuf>) -> Self {
        Self::Access { path: path.into() }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Classify an error from opening `path` for reading
    pub(crate) fn from_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::access(path),
            _ => Self::Io { source: err },
        }
    }
}
