//! Register block geometry.
//!
//! ```text
//! Zone        Range           Contents
//! ─────────── ─────────────── ───────────────────────────────────
//! header      0x000 – 0x00B   magic, version, status (u32 each)
//! telemetry   0x010 – 0x053   four sparse f32 slots
//! reserved    everything else must not be interpreted
//! ```

/// Size of the register block in bytes. One page, never resized.
pub const SIZE: usize = 4096;

/// Width of every register in the block.
pub const REGISTER_WIDTH: usize = 4;

/// Header zone: identity, version and status words.
pub mod header {
    /// First byte of the header zone.
    pub const START: usize = 0x000;
    /// One past the last byte of the header zone.
    pub const END: usize = 0x00C;
}

/// Telemetry zone. Slots inside it are sparse.
pub mod telemetry {
    /// First byte of the telemetry zone.
    pub const START: usize = 0x010;
    /// One past the last byte of the telemetry zone.
    pub const END: usize = 0x054;
}

/// True if a `width`-byte access at `offset` lies entirely inside the block.
#[must_use]
pub const fn contains(offset: usize, width: usize) -> bool {
    match offset.checked_add(width) {
        Some(end) => end <= SIZE,
        None => false,
    }
}

/// True if `offset` is naturally aligned for a register access.
#[must_use]
pub const fn is_aligned(offset: usize) -> bool {
    offset % REGISTER_WIDTH == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zones_fit_in_block_and_do_not_overlap() {
        assert!(header::END <= telemetry::START);
        assert!(telemetry::END <= SIZE);
    }

    #[test]
    fn bounds() {
        assert!(contains(0, 4));
        assert!(contains(SIZE - 4, 4));
        assert!(!contains(SIZE - 3, 4));
        assert!(!contains(usize::MAX, 4));
    }

    #[test]
    fn alignment() {
        assert!(is_aligned(0x50));
        assert!(!is_aligned(0x51));
    }
}
