//! Provider and polling reader for the simulated sensor register block.
//!
//! A provider owns one 4 KB register page, writes its header once and
//! publishes it under a stable name. Readers map the page read-only and poll
//! four f32 telemetry fields. There is no handshake, lock or sequence counter
//! between the two sides: every access is one volatile load or store, and a
//! sample may mix values from different provider updates.
//!
//! # Quick start
//!
//! ```no_run
//! use simsensor_driver::{reader, RegisterBlockProvider, ShmRegistry, TelemetryField};
//! use std::time::Duration;
//!
//! # fn main() -> simsensor_driver::Result<()> {
//! let mut provider = RegisterBlockProvider::initialize("sim_sensor.bin", ShmRegistry::default())?;
//! provider.write_telemetry(TelemetryField::AccelZ, 9.81)?;
//!
//! let view = reader::open("/dev/shm/sim_sensor.bin")?;
//! for sample in reader::poll(&view, Duration::from_millis(100), 5) {
//!     println!("{sample}");
//! }
//! reader::close(view)?;
//!
//! provider.teardown()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod config;
mod error;
pub mod mmio;
pub mod provider;
pub mod reader;
pub mod resolve;
mod sample;
pub mod sim;

pub use config::ReaderConfig;
pub use error::{Result, SensorError};
pub use mmio::{BlockMemory, Header, RegisterView};
pub use provider::{RegisterBlockProvider, Registry, ShmRegistry};
pub use sample::Sample;
pub use sim::{Noise, Scenario, TelemetrySink};

/// Register map (re-exported from simsensor-regs).
pub use simsensor_regs::{block, regs, TelemetryField, Version};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        reader, Header, ReaderConfig, RegisterBlockProvider, RegisterView, Registry, Result,
        Sample, Scenario, SensorError, ShmRegistry, TelemetryField,
    };
}
