use crate::{
    config::StressConfig,
    timing::{Summary, Timing},
};
use core::{fmt, time::Duration};
use mqueue::{Error, MessageId, MessageQueue};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use std::{thread, time::Instant};

/// Shared counters and phase flags for one stress run.
#[derive(Default)]
struct Stats {
    submitting: AtomicBool,
    running: AtomicBool,
    requests: AtomicU64,
    responses: AtomicU64,
    failed_requests: AtomicU64,
    failed_responses: AtomicU64,
}

/// Outcome of a stress run.
#[derive(Debug, Clone)]
pub struct Report {
    pub elapsed: Duration,
    /// Requests taken and echoed by workers.
    pub requests: u64,
    /// Responses received by producers.
    pub responses: u64,
    /// Worker `take_request` calls that ended without a request.
    pub failed_requests: u64,
    /// Producer `take_response` calls that ended without a response.
    pub failed_responses: u64,
    /// Payloads still queued or parked when the engine shut down.
    pub cleaned: usize,
    pub timing: Option<Summary>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- REQUESTS and RESPONSES ---")?;
        writeln!(f, "REQUESTS         :\t{:>10}", self.requests)?;
        writeln!(f, "RESPONSES        :\t{:>10}", self.responses)?;
        writeln!(f, "REQUESTS failed  :\t{:>10}", self.failed_requests)?;
        writeln!(f, "RESPONSES failed :\t{:>10}", self.failed_responses)?;
        writeln!(f, "CLEANED          :\t{:>10}", self.cleaned)?;
        writeln!(f, "ELAPSED          :\t{:>10.2?}", self.elapsed)
    }
}

/// Echoes requests back as responses until the run flag drops.
fn worker(queue: &MessageQueue<Instant>, stats: &Stats) {
    while stats.running.load(Ordering::Acquire) {
        match queue.take_request() {
            Ok(request) => {
                stats.requests.fetch_add(1, Ordering::Relaxed);
                if let Err(rejected) = queue.publish_envelope(request) {
                    tracing::debug!(error = %rejected, "echo rejected");
                }
            }
            Err(err) => {
                stats.failed_requests.fetch_add(1, Ordering::Relaxed);
                if !matches!(err, Error::Closed) {
                    tracing::warn!(error = %err, "take_request failed");
                }
            }
        }
    }
}

/// Submits batches of timestamped requests while submissions are allowed and
/// awaits every response of a batch before starting the next.
fn producer(queue: &MessageQueue<Instant>, stats: &Stats, timing: &Timing, batch: usize) {
    let mut pending: Vec<MessageId> = Vec::with_capacity(batch);

    while stats.running.load(Ordering::Acquire) && stats.submitting.load(Ordering::Acquire) {
        for _ in 0..batch {
            match queue.submit(Instant::now()) {
                Ok(id) => pending.push(id),
                Err(_) => break,
            }
        }

        for id in pending.drain(..) {
            match queue.take_response(id) {
                Ok(sent) => {
                    timing.record(sent.elapsed());
                    stats.responses.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    stats.failed_responses.fetch_add(1, Ordering::Relaxed);
                    if !matches!(err, Error::Closed) {
                        tracing::warn!(%id, error = %err, "take_response failed");
                    }
                }
            }
        }
    }
}

/// Runs producers and echo workers against one engine.
///
/// Submissions stop after `config.duration`; `config.drain` later the run
/// flag drops and the engine is shut down, which releases every thread still
/// parked inside it.
pub fn run(config: &StressConfig) -> anyhow::Result<Report> {
    let queue = MessageQueue::<Instant>::with_config(config.queue)?;
    let stats = Stats::default();
    let timing = Timing::new();

    stats.running.store(true, Ordering::Release);
    stats.submitting.store(true, Ordering::Release);

    tracing::info!(
        workers = config.workers,
        producers = config.producers,
        batch = config.batch,
        shards = queue.shard_count(),
        duration = ?config.duration,
        "stress run starting"
    );

    let start = Instant::now();
    let cleaned = thread::scope(|s| -> anyhow::Result<usize> {
        let mut handles = Vec::with_capacity(config.workers + config.producers);

        for _ in 0..config.workers {
            handles.push(s.spawn(|| worker(&queue, &stats)));
        }
        for _ in 0..config.producers {
            handles.push(s.spawn(|| producer(&queue, &stats, &timing, config.batch)));
        }

        thread::sleep(config.duration);
        stats.submitting.store(false, Ordering::Release);
        tracing::info!("submissions stopped, draining responses");

        thread::sleep(config.drain);
        stats.running.store(false, Ordering::Release);

        let mut cleaned = 0;
        queue.shutdown(|_| cleaned += 1);
        tracing::info!(cleaned, "engine shut down, joining threads");

        for handle in handles {
            if handle.join().is_err() {
                anyhow::bail!("stress thread panicked");
            }
        }
        Ok(cleaned)
    })?;

    Ok(Report {
        elapsed: start.elapsed(),
        requests: stats.requests.load(Ordering::Relaxed),
        responses: stats.responses.load(Ordering::Relaxed),
        failed_requests: stats.failed_requests.load(Ordering::Relaxed),
        failed_responses: stats.failed_responses.load(Ordering::Relaxed),
        cleaned,
        timing: timing.summary(),
    })
}
