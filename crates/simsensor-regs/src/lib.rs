//! Register map for the RAM-backed simulated sensor block.
//!
//! This crate has **no dependencies** and **no memory access** — it is a
//! pure model of the register page: block geometry, register offsets, header
//! constants, and the typed list of telemetry fields.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`block`] | Block geometry (4 KB page, header zone, telemetry zone) |
//! | [`regs`] | Register offsets and header constants |
//! | [`field`] | [`TelemetryField`] — the four modelled f32 slots |
//! | [`version`] | Packed `major << 16 \| minor` version word |
//!
//! ```text
//! Offset  Field     Type     Notes
//! ──────  ────────  ───────  ──────────────────────────────
//! 0x000   magic     u32 LE   fixed identity constant
//! 0x004   version   u32 LE   major << 16 | minor
//! 0x008   status    u32 LE   0 = not ready, nonzero = ready
//! 0x010   accel_x   f32 LE   g-units
//! 0x014   accel_y   f32 LE   g-units
//! 0x018   accel_z   f32 LE   g-units
//! 0x050   airspeed  f32 LE   unit-agnostic scalar
//! ```
//!
//! Every other offset in the page is reserved.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod field;
pub mod regs;
pub mod version;

pub use field::TelemetryField;
pub use version::Version;
