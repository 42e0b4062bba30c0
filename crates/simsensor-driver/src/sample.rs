//! Telemetry sample

use simsensor_regs::TelemetryField;
use std::fmt;

/// One reading of the four telemetry fields
///
/// Fields come from independent loads and may mix provider update cycles.
/// `Display` renders the reader's output line:
///
/// ```text
/// ACCEL: +0.100 -0.031 +9.810  V=15.25
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Accelerometer X, g-units
    pub accel_x: f32,
    /// Accelerometer Y, g-units
    pub accel_y: f32,
    /// Accelerometer Z, g-units
    pub accel_z: f32,
    /// Airspeed
    pub airspeed: f32,
}

impl Sample {
    /// Build a sample by reading each field in [`TelemetryField::ALL`] order
    pub fn from_fields(mut read: impl FnMut(TelemetryField) -> f32) -> Self {
        Self {
            accel_x: read(TelemetryField::AccelX),
            accel_y: read(TelemetryField::AccelY),
            accel_z: read(TelemetryField::AccelZ),
            airspeed: read(TelemetryField::Airspeed),
        }
    }

    /// Value of one field
    #[must_use]
    pub const fn get(&self, field: TelemetryField) -> f32 {
        match field {
            TelemetryField::AccelX => self.accel_x,
            TelemetryField::AccelY => self.accel_y,
            TelemetryField::AccelZ => self.accel_z,
            TelemetryField::Airspeed => self.airspeed,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACCEL: {:+.3} {:+.3} {:+.3}  V={:.2}",
            self.accel_x, self.accel_y, self.accel_z, self.airspeed
        )
    }
}
