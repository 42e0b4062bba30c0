//! Telemetry simulator
//!
//! Deterministic flight scenarios written into a register block at a fixed
//! rate, optionally with Gaussian sensor noise. Only the four modelled fields
//! are produced.
//!
//! The block is either one this process registers ([`RegisterBlockProvider`])
//! or one another provider owns, mapped with [`BlockMemory::attach`].

use crate::error::Result;
use crate::mmio::BlockMemory;
use crate::provider::{RegisterBlockProvider, Registry};
use crate::sample::Sample;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use simsensor_regs::TelemetryField;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Standard gravity used for the resting Z axis
const GRAVITY: f64 = 9.81;
/// Knots to metres per second
const KT_TO_MS: f64 = 0.514_444;
/// Length of one approach loop
const APPROACH_SECS: f64 = 360.0;
/// Lowest accepted update rate
const MIN_RATE_HZ: f64 = 1e-6;

/// Accelerometer noise standard deviation (m/s²)
pub const ACCEL_SIGMA: f64 = 0.02;
/// Airspeed noise standard deviation (m/s)
pub const AIRSPEED_SIGMA: f64 = 0.2;

/// Flight scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Gentle circling loiter
    #[default]
    Loiter,
    /// Looping straight-in approach, 80 kt down to 65 kt over six minutes
    Approach,
}

/// Unknown scenario name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario {0:?} (expected loiter or approach)")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "loiter" => Ok(Self::Loiter),
            "approach" => Ok(Self::Approach),
            _ => Err(UnknownScenario(s.to_owned())),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loiter => "loiter",
            Self::Approach => "approach",
        })
    }
}

fn lerp(a: f64, b: f64, s: f64) -> f64 {
    a + (b - a) * s.clamp(0.0, 1.0)
}

impl Scenario {
    /// Telemetry at `t` seconds into the scenario
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn at(self, t: f64) -> Sample {
        let (ax, ay, az, airspeed) = match self {
            Self::Loiter => (
                0.1 * (0.5 * t).sin(),
                0.1 * (0.5 * t).cos(),
                GRAVITY,
                15.0 + 2.0 * (0.3 * t).sin(),
            ),
            Self::Approach => {
                let phase = t.rem_euclid(APPROACH_SECS) / APPROACH_SECS;
                (
                    0.05 * (0.4 * t).sin(),
                    0.03 * (0.9 * t + 1.2).sin(),
                    GRAVITY + 0.02 * (1.3 * t).sin(),
                    lerp(80.0, 65.0, phase) * KT_TO_MS + 0.8 * (0.6 * t).sin(),
                )
            }
        };

        Sample {
            accel_x: ax as f32,
            accel_y: ay as f32,
            accel_z: az as f32,
            airspeed: airspeed as f32,
        }
    }
}

/// Gaussian noise added to every update
///
/// Seeded explicitly, so a run can be replayed from the logged seed.
#[derive(Debug, Clone)]
pub struct Noise {
    seed: u64,
    rng: StdRng,
    accel: Normal<f64>,
    airspeed: Normal<f64>,
}

impl Noise {
    /// Noise with the given standard deviations
    ///
    /// # Errors
    ///
    /// Returns an error if a standard deviation is negative or not finite.
    pub fn new(
        seed: u64,
        accel_sigma: f64,
        airspeed_sigma: f64,
    ) -> std::result::Result<Self, NormalError> {
        Ok(Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            accel: Normal::new(0.0, accel_sigma)?,
            airspeed: Normal::new(0.0, airspeed_sigma)?,
        })
    }

    /// Default sensor noise seeded with `seed`
    ///
    /// # Errors
    ///
    /// Never fails for the built-in standard deviations.
    pub fn with_seed(seed: u64) -> std::result::Result<Self, NormalError> {
        Self::new(seed, ACCEL_SIGMA, AIRSPEED_SIGMA)
    }

    /// Default sensor noise seeded from the wall clock (seconds, low 32 bits)
    ///
    /// # Errors
    ///
    /// Never fails for the built-in standard deviations.
    pub fn from_clock() -> std::result::Result<Self, NormalError> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::with_seed(secs & 0xffff_ffff)
    }

    /// Seed this noise source was created with
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// `sample` with independent noise added to each field
    pub fn apply(&mut self, sample: Sample) -> Sample {
        Sample::from_fields(|field| {
            let dist = match field {
                TelemetryField::Airspeed => &self.airspeed,
                _ => &self.accel,
            };
            jitter(&mut self.rng, dist, sample.get(field))
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn jitter(rng: &mut StdRng, dist: &Normal<f64>, value: f32) -> f32 {
    (f64::from(value) + dist.sample(rng)) as f32
}

/// Destination for simulated telemetry
pub trait TelemetrySink {
    /// Name used in log messages
    fn label(&self) -> String;

    /// Store all four telemetry fields
    ///
    /// # Errors
    ///
    /// Returns an error if the block can no longer be written.
    fn publish(&mut self, sample: &Sample) -> Result<()>;
}

impl<R: Registry> TelemetrySink for RegisterBlockProvider<R> {
    fn label(&self) -> String {
        self.identity()
            .map_or_else(|| self.name().to_owned(), |p| p.display().to_string())
    }

    fn publish(&mut self, sample: &Sample) -> Result<()> {
        RegisterBlockProvider::publish(self, sample)
    }
}

impl TelemetrySink for BlockMemory {
    fn label(&self) -> String {
        self.path().display().to_string()
    }

    fn publish(&mut self, sample: &Sample) -> Result<()> {
        for field in TelemetryField::ALL {
            self.write_field(field, sample.get(field));
        }
        Ok(())
    }
}

/// Update period for `rate_hz`, clamped to a sane minimum rate
#[must_use]
pub fn period(rate_hz: f64) -> Duration {
    let rate = if rate_hz.is_finite() { rate_hz.max(MIN_RATE_HZ) } else { MIN_RATE_HZ };
    Duration::from_secs_f64(1.0 / rate)
}

/// Write `scenario` into `sink` at `rate_hz`
///
/// Runs for `duration`, or forever if `None`. With `noise`, every update is
/// perturbed before it is stored. Returns the number of updates published.
///
/// # Errors
///
/// Returns the sink's error, e.g. if the provider has been torn down.
pub fn run<S: TelemetrySink>(
    sink: &mut S,
    scenario: Scenario,
    rate_hz: f64,
    duration: Option<Duration>,
    mut noise: Option<Noise>,
) -> Result<u64> {
    let period = period(rate_hz);
    let label = sink.label();
    let start = Instant::now();
    let mut updates = 0u64;

    tracing::info!(
        "{label}: scenario={scenario} rate={:.1}Hz",
        1.0 / period.as_secs_f64()
    );
    if let Some(noise) = &noise {
        tracing::info!("{label}: noise seed={}", noise.seed());
    }

    loop {
        let elapsed = start.elapsed();
        if duration.is_some_and(|d| elapsed >= d) {
            break;
        }

        let mut sample = scenario.at(elapsed.as_secs_f64());
        if let Some(noise) = noise.as_mut() {
            sample = noise.apply(sample);
        }
        sink.publish(&sample)?;
        updates += 1;

        std::thread::sleep(period);
    }

    tracing::info!("{label}: published {updates} updates");
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f64) -> bool {
        (f64::from(a) - b).abs() < 1e-4
    }

    #[test]
    fn loiter_at_start() {
        let s = Scenario::Loiter.at(0.0);
        assert!(close(s.accel_x, 0.0));
        assert!(close(s.accel_y, 0.1));
        assert!(close(s.accel_z, 9.81));
        assert!(close(s.airspeed, 15.0));
    }

    #[test]
    fn approach_slows_and_loops() {
        let start = Scenario::Approach.at(0.0);
        assert!(close(start.airspeed, 80.0 * KT_TO_MS));

        let t = APPROACH_SECS * 0.999;
        let late = Scenario::Approach.at(t);
        let expected = lerp(80.0, 65.0, 0.999) * KT_TO_MS + 0.8 * (0.6 * t).sin();
        assert!(close(late.airspeed, expected));
        assert!(late.airspeed < start.airspeed);

        // Back to 80 kt after one loop
        let wrapped = Scenario::Approach.at(APPROACH_SECS);
        let expected = 80.0 * KT_TO_MS + 0.8 * (0.6 * APPROACH_SECS).sin();
        assert!(close(wrapped.airspeed, expected));
    }

    #[test]
    fn parse_names() {
        assert_eq!("loiter".parse::<Scenario>(), Ok(Scenario::Loiter));
        assert_eq!("APPROACH".parse::<Scenario>(), Ok(Scenario::Approach));
        assert!("eddf".parse::<Scenario>().is_err());
        assert_eq!(Scenario::Approach.to_string(), "approach");
    }

    #[test]
    fn period_clamps_rate() {
        assert_eq!(period(100.0), Duration::from_millis(10));
        assert_eq!(period(0.0), period(MIN_RATE_HZ));
        assert_eq!(period(f64::NAN), period(MIN_RATE_HZ));
    }

    #[test]
    fn noise_is_seeded_and_bounded() {
        let mut a = Noise::with_seed(42).expect("noise");
        let mut b = Noise::with_seed(42).expect("noise");
        assert_eq!(a.seed(), 42);

        let n = 2000;
        let mut sum_sq = [0.0f64; 2];
        for i in 0..n {
            let clean = Scenario::Loiter.at(f64::from(i) * 0.01);
            let noisy = a.apply(clean);
            assert_eq!(noisy, b.apply(clean), "same seed, same noise");

            for field in TelemetryField::ALL {
                let delta = f64::from(noisy.get(field)) - f64::from(clean.get(field));
                let (slot, sigma) = match field {
                    TelemetryField::Airspeed => (1, AIRSPEED_SIGMA),
                    _ => (0, ACCEL_SIGMA),
                };
                assert!(delta.abs() < 6.0 * sigma, "{field}: {delta}");
                sum_sq[slot] += delta * delta;
            }
        }

        let accel_sd = (sum_sq[0] / f64::from(3 * n)).sqrt();
        let airspeed_sd = (sum_sq[1] / f64::from(n)).sqrt();
        assert!((accel_sd - ACCEL_SIGMA).abs() < 0.2 * ACCEL_SIGMA, "{accel_sd}");
        assert!((airspeed_sd - AIRSPEED_SIGMA).abs() < 0.2 * AIRSPEED_SIGMA, "{airspeed_sd}");
    }

    #[test]
    fn noise_rejects_bad_sigma() {
        assert!(Noise::new(1, -1.0, AIRSPEED_SIGMA).is_err());
        assert!(Noise::new(1, ACCEL_SIGMA, f64::NAN).is_err());
        assert!(Noise::from_clock().expect("noise").seed() <= 0xffff_ffff);
    }

    #[test]
    fn lerp_clamps() {
        assert!((lerp(80.0, 65.0, 2.0) - 65.0).abs() < f64::EPSILON);
        assert!((lerp(80.0, 65.0, -1.0) - 80.0).abs() < f64::EPSILON);
    }
}
