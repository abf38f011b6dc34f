#![doc = include_str!("../README.md")]

mod config;
mod driver;
mod telemetry;
mod timing;

use clap::Parser;
use config::{CliArgs, StressConfig};
use std::io::{IsTerminal, Write};
use telemetry::init_telemetry;

// Producers and workers allocate envelopes on every round trip; mimalloc
// holds up better than the system allocator under that contention.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = StressConfig::try_from(args)?;

    init_telemetry()?;

    let report = driver::run(&config)?;

    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    writeln!(out, "{report}")?;
    match &report.timing {
        Some(summary) => {
            write!(out, "{summary}")?;
            if config.histogram {
                writeln!(out)?;
                write!(out, "{}", summary.histogram(color))?;
            }
        }
        None => writeln!(out, "no round trips completed")?,
    }

    tracing::info!("stress run finished");
    Ok(())
}
