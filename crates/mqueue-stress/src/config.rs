use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use mqueue::{DEFAULT_SHARDS, QueueConfig};

/// Runtime configuration for the `mqueue-stress` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is honored), with defaults matching the classic run: two echo workers,
/// six producers, one request in flight per producer, one minute of load.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mqueue-stress",
    version,
    about = "Hammer an mqueue engine with producers and echo workers and report round-trip latency"
)]
pub struct CliArgs {
    /// Number of worker threads echoing requests back as responses.
    ///
    /// Environment variable: `STRESS_WORKERS`
    #[arg(long, env = "STRESS_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Number of producer threads submitting requests and awaiting responses.
    ///
    /// Environment variable: `STRESS_PRODUCERS`
    #[arg(long, env = "STRESS_PRODUCERS", default_value_t = 6)]
    pub producers: usize,

    /// Requests each producer submits before collecting their responses.
    ///
    /// Environment variable: `STRESS_BATCH`
    #[arg(long, env = "STRESS_BATCH", default_value_t = 1)]
    pub batch: usize,

    /// How long producers keep submitting new requests, in seconds.
    ///
    /// Environment variable: `STRESS_DURATION_SECS`
    #[arg(long, env = "STRESS_DURATION_SECS", default_value_t = 60)]
    pub duration_secs: u64,

    /// Grace period after submissions stop, letting outstanding responses
    /// arrive before the engine is shut down, in milliseconds.
    ///
    /// Environment variable: `STRESS_DRAIN_MILLIS`
    #[arg(long, env = "STRESS_DRAIN_MILLIS", default_value_t = 2000)]
    pub drain_millis: u64,

    /// Number of correlation shards in the engine.
    ///
    /// Environment variable: `STRESS_SHARDS`
    #[arg(long, env = "STRESS_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Upper bound on a single blocked wait inside the engine, in
    /// microseconds. Bounds how quickly parked threads notice shutdown.
    ///
    /// Environment variable: `STRESS_WAIT_INTERVAL_MICROS`
    #[arg(long, env = "STRESS_WAIT_INTERVAL_MICROS", default_value_t = 1000)]
    pub wait_interval_micros: u64,

    /// Skip the latency histogram in the final report.
    #[arg(long, default_value_t = false)]
    pub no_histogram: bool,
}

#[derive(Debug, Clone)]
pub struct StressConfig {
    pub workers: usize,
    pub producers: usize,
    pub batch: usize,
    pub duration: Duration,
    pub drain: Duration,
    pub queue: QueueConfig,
    pub histogram: bool,
}

impl TryFrom<CliArgs> for StressConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("STRESS_WORKERS must be greater than 0");
        }
        if args.producers == 0 {
            bail!("STRESS_PRODUCERS must be greater than 0");
        }
        if args.batch == 0 {
            bail!("STRESS_BATCH must be greater than 0");
        }
        if args.shards == 0 {
            bail!("STRESS_SHARDS must be greater than 0");
        }
        if args.wait_interval_micros == 0 {
            bail!("STRESS_WAIT_INTERVAL_MICROS must be greater than 0");
        }

        Ok(Self {
            workers: args.workers,
            producers: args.producers,
            batch: args.batch,
            duration: Duration::from_secs(args.duration_secs),
            drain: Duration::from_millis(args.drain_millis),
            queue: QueueConfig::new(
                args.shards,
                Duration::from_micros(args.wait_interval_micros),
            ),
            histogram: !args.no_histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("mqueue-stress").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_classic_run() {
        let config = StressConfig::try_from(parse(&[])).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.producers, 6);
        assert_eq!(config.batch, 1);
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.queue.shards, DEFAULT_SHARDS);
        assert!(config.histogram);
    }

    #[test]
    fn flags_override_defaults() {
        let config = StressConfig::try_from(parse(&[
            "--workers",
            "4",
            "--producers",
            "3",
            "--batch",
            "8",
            "--duration-secs",
            "1",
            "--shards",
            "16",
            "--wait-interval-micros",
            "250",
            "--no-histogram",
        ]))
        .unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.producers, 3);
        assert_eq!(config.batch, 8);
        assert_eq!(config.duration, Duration::from_secs(1));
        assert_eq!(config.queue, QueueConfig::new(16, Duration::from_micros(250)));
        assert!(!config.histogram);
    }

    #[test]
    fn zero_counts_are_rejected() {
        for flag in ["--workers", "--producers", "--batch", "--shards"] {
            let err = StressConfig::try_from(parse(&[flag, "0"])).unwrap_err();
            assert!(err.to_string().contains("must be greater than 0"), "{flag}: {err}");
        }
    }
}
