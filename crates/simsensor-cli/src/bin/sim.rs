//! `simsensor-sim` — feed flight telemetry into a sensor register block.
//!
//! ```text
//! USAGE:
//!   simsensor-sim [--name NAME] [--dir DIR] [--rate HZ] [--scenario loiter|approach]
//!                 [--seconds N] [--noise] [--seed N]
//!   simsensor-sim --attach PATH [--rate HZ] [--scenario ...] [--seconds N] [--noise]
//! ```
//!
//! Without `--attach` the simulator registers its own shared-memory block;
//! readers open it as `simsensor-read NAME` (or `DIR/NAME`). With `--attach`
//! it writes telemetry into a block another provider already registered,
//! e.g. `/dev/uio0`, and leaves that block's header alone.

use anyhow::{Context, Result};
use clap::Parser;
use simsensor_driver::sim::{self, Noise, TelemetrySink};
use simsensor_driver::{config, BlockMemory, RegisterBlockProvider, Scenario, ShmRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simsensor-sim", about = "Flight sensor simulator", version)]
struct Cli {
    /// Name to register the block under.
    #[arg(long, default_value = config::DEFAULT_BLOCK_NAME)]
    name: String,

    /// Registry directory (default: $SIMSENSOR_SHM_DIR or /dev/shm).
    #[arg(long, conflicts_with = "attach")]
    dir: Option<PathBuf>,

    /// Feed an existing block (e.g. /dev/uio0) instead of registering one.
    #[arg(long, value_name = "PATH")]
    attach: Option<PathBuf>,

    /// Update rate in Hz.
    #[arg(long, default_value_t = config::DEFAULT_RATE_HZ)]
    rate: f64,

    /// Telemetry scenario: loiter or approach.
    #[arg(long, default_value_t = Scenario::Loiter)]
    scenario: Scenario,

    /// Stop after this many seconds (default: run until killed).
    #[arg(long)]
    seconds: Option<f64>,

    /// Add Gaussian sensor noise.
    #[arg(long)]
    noise: bool,

    /// Noise seed (default: wall clock). Implies --noise.
    #[arg(long)]
    seed: Option<u64>,
}

fn feed<S: TelemetrySink>(
    sink: &mut S,
    cli: &Cli,
    duration: Option<Duration>,
    noise: Option<Noise>,
) -> Result<()> {
    println!(
        "[sim] {} scenario={} rate={}Hz noise={}",
        sink.label(),
        cli.scenario,
        cli.rate,
        noise.as_ref().map_or_else(|| "off".to_owned(), |n| format!("seed {}", n.seed()))
    );
    sim::run(sink, cli.scenario, cli.rate, duration, noise)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let duration = cli
        .seconds
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--seconds must be a non-negative number")?;

    let noise = match (cli.seed, cli.noise) {
        (Some(seed), _) => Some(Noise::with_seed(seed)?),
        (None, true) => Some(Noise::from_clock()?),
        (None, false) => None,
    };

    if let Some(path) = &cli.attach {
        let mut memory = BlockMemory::attach(path)
            .with_context(|| format!("cannot attach to {}", path.display()))?;
        return feed(&mut memory, &cli, duration, noise);
    }

    let registry = cli
        .dir
        .clone()
        .map_or_else(ShmRegistry::from_env, ShmRegistry::new);

    let mut provider = RegisterBlockProvider::initialize(&cli.name, registry)
        .with_context(|| format!("cannot set up register block {:?}", cli.name))?;

    let result = feed(&mut provider, &cli, duration, noise);
    provider.teardown().context("teardown failed")?;
    result
}
