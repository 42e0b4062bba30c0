//! Register offsets and header constants.
//!
//! Header values match the original kernel module (`uio_sim_sensor`), which
//! writes them once before registering the device.

// ── Header ───────────────────────────────────────────────────────────────────

/// Identity tag register.
pub const MAGIC: usize = 0x000;
/// Packed version register (`major << 16 | minor`).
pub const VERSION: usize = 0x004;
/// Status register.
pub const STATUS: usize = 0x008;

// ── Telemetry ────────────────────────────────────────────────────────────────

/// Accelerometer X axis, g-units.
pub const ACCEL_X: usize = 0x010;
/// Accelerometer Y axis, g-units.
pub const ACCEL_Y: usize = 0x014;
/// Accelerometer Z axis, g-units.
pub const ACCEL_Z: usize = 0x018;
/// Airspeed.
pub const AIRSPEED: usize = 0x050;

// ── Header values ────────────────────────────────────────────────────────────

/// Value of the magic register on a valid block.
pub const MAGIC_VALUE: u32 = 0x5355_4D31;

/// Version word written by the provider (1.0).
pub const VERSION_VALUE: u32 = crate::Version::new(1, 0).packed();

/// Status register values.
pub mod status {
    /// Block not yet initialized.
    pub const NOT_READY: u32 = 0;
    /// Block initialized and safe to sample.
    pub const OK: u32 = 1;

    /// Any nonzero status means ready.
    #[must_use]
    pub const fn is_ready(status: u32) -> bool {
        status != NOT_READY
    }
}
