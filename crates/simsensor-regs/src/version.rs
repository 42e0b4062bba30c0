//! Packed version word.

use std::fmt;

/// Register block version, stored as `major << 16 | minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version (upper 16 bits).
    pub major: u16,
    /// Minor version (lower 16 bits).
    pub minor: u16,
}

impl Version {
    /// Build a version from its parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Encode as the register word.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn packed(self) -> u32 {
        (self.major as u32) << 16 | self.minor as u32
    }

    /// Decode a register word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn unpack(word: u32) -> Self {
        Self {
            major: (word >> 16) as u16,
            minor: (word & 0xFFFF) as u16,
        }
    }
}

impl From<u32> for Version {
    fn from(word: u32) -> Self {
        Self::unpack(word)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
