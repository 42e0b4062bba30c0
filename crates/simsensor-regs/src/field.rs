//! Telemetry fields.

use crate::regs;
use std::fmt;

/// One of the four f32 slots in the telemetry zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryField {
    /// Accelerometer X (`0x010`).
    AccelX,
    /// Accelerometer Y (`0x014`).
    AccelY,
    /// Accelerometer Z (`0x018`).
    AccelZ,
    /// Airspeed (`0x050`).
    Airspeed,
}

impl TelemetryField {
    /// Every field, in sampling order.
    pub const ALL: [Self; 4] = [Self::AccelX, Self::AccelY, Self::AccelZ, Self::Airspeed];

    /// Byte offset of the field inside the block.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::AccelX => regs::ACCEL_X,
            Self::AccelY => regs::ACCEL_Y,
            Self::AccelZ => regs::ACCEL_Z,
            Self::Airspeed => regs::AIRSPEED,
        }
    }

    /// Short register name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccelX => "accel_x",
            Self::AccelY => "accel_y",
            Self::AccelZ => "accel_z",
            Self::Airspeed => "airspeed",
        }
    }
}

impl fmt::Display for TelemetryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#05x}", self.name(), self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;

    #[test]
    fn offsets_are_aligned_and_in_telemetry_zone() {
        for field in TelemetryField::ALL {
            let off = field.offset();
            assert!(block::is_aligned(off), "{field} misaligned");
            assert!(off >= block::telemetry::START);
            assert!(off + block::REGISTER_WIDTH <= block::telemetry::END);
        }
    }

    #[test]
    fn offsets_distinct() {
        let offs = TelemetryField::ALL.map(TelemetryField::offset);
        for (i, a) in offs.iter().enumerate() {
            for b in &offs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(TelemetryField::Airspeed.to_string(), "airspeed@0x050");
    }
}
