//! Log output for the stress binary.
//!
//! Events go to stderr through a `fmt` layer so the final report on stdout
//! stays clean. The level is taken from `RUST_LOG` and defaults to `info`;
//! `RUST_LOG=mqueue=trace` additionally shows the engine's own spans when the
//! library's `tracing` feature is enabled.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}
