//! `simsensor-read` — poll the sensor register block and print telemetry.
//!
//! ```text
//! USAGE:
//!   simsensor-read [IDENTITY]
//!
//!   IDENTITY   /dev/uioN, uioN, a path, or a name in $SIMSENSOR_SHM_DIR
//!              (default /dev/uio0)
//! ```
//!
//! Prints 20 samples, one every 100 ms. Exits 1 if the block cannot be
//! opened or mapped.

use anyhow::{Context, Result};
use clap::Parser;
use simsensor_driver::{reader, ReaderConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simsensor-read", about = "Poll the simulated sensor register block", version)]
struct Cli {
    /// Register block identity (e.g. /dev/uio0 or sim_sensor.bin).
    identity: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ReaderConfig::from_env();
    if let Some(identity) = cli.identity {
        config = config.with_identity(identity);
    }

    let path = config.path();
    let mut out = std::io::stdout().lock();
    reader::run_session(&config, &mut out)
        .with_context(|| format!("cannot poll {}", path.display()))?;

    Ok(())
}
