use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mqueue::{MessageQueue, QueueConfig};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::{Duration, Instant},
};

// Number of round trips per benchmark iteration (split across producer
// threads for multi-threaded groups).
const TOTAL_MESSAGES: usize = 4096;

const WAIT_INTERVAL: Duration = Duration::from_micros(100);

fn config(shards: usize) -> QueueConfig {
    QueueConfig::default()
        .with_shards(shards)
        .with_wait_interval(WAIT_INTERVAL)
}

/// Echoes requests until the queue closes.
fn echo_worker(queue: &MessageQueue<u64>) {
    while let Ok(request) = queue.take_request() {
        if queue.publish_envelope(request).is_err() {
            break;
        }
    }
}

/// Runs `producers` threads, each completing `per_producer` round trips
/// against `workers` echo threads, and returns the time until the last
/// response was taken.
fn run_round_trips(
    queue: &Arc<MessageQueue<u64>>,
    producers: usize,
    workers: usize,
    per_producer: usize,
) -> Duration {
    let barrier = Arc::new(Barrier::new(producers + 1));
    scope(|s| {
        for _ in 0..workers {
            let queue = Arc::clone(queue);
            s.spawn(move || echo_worker(&queue));
        }

        let handles: Vec<_> = (0..producers)
            .map(|_| {
                let queue = Arc::clone(queue);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    for n in 0..per_producer as u64 {
                        let id = queue.submit(n).unwrap();
                        black_box(queue.take_response(id).unwrap());
                    }
                })
            })
            .collect();

        barrier.wait();
        let start = Instant::now();
        for handle in handles {
            handle.join().unwrap();
        }
        let elapsed = start.elapsed();

        queue.shutdown(drop);
        elapsed
    })
}

/// Round trips on a single thread: submit, take, publish, take response.
fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential/round_trip");
    group.throughput(Throughput::Elements(TOTAL_MESSAGES as u64));

    group.bench_function(format!("elems/{TOTAL_MESSAGES}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let queue = MessageQueue::with_config(config(256)).unwrap();
                for n in 0..TOTAL_MESSAGES as u64 {
                    let id = queue.submit(n).unwrap();
                    let request = queue.take_request().unwrap();
                    queue.publish_envelope(request).unwrap();
                    black_box(queue.take_response(id).unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Producers contending on one queue served by two echo workers.
fn bench_contended_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended/producers");

    for producers in [1, 2, 4, 8] {
        let per_producer = TOTAL_MESSAGES / producers;

        group.throughput(Throughput::Elements(TOTAL_MESSAGES as u64));
        group.bench_function(
            format!("elems/{TOTAL_MESSAGES}/producers/{producers}"),
            |b| {
                b.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let queue = Arc::new(MessageQueue::with_config(config(256)).unwrap());
                        total += run_round_trips(&queue, producers, 2, per_producer);
                    }
                    total
                });
            },
        );
    }

    group.finish();
}

/// Same load with different shard counts; one shard degenerates to a single
/// global response lock.
fn bench_shard_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended/shards");
    let producers = 8;
    let per_producer = TOTAL_MESSAGES / producers;

    for shards in [1, 16, 256] {
        group.throughput(Throughput::Elements(TOTAL_MESSAGES as u64));
        group.bench_function(format!("elems/{TOTAL_MESSAGES}/shards/{shards}"), |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let queue = Arc::new(MessageQueue::with_config(config(shards)).unwrap());
                    total += run_round_trips(&queue, producers, 4, per_producer);
                }
                total
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential,
    bench_contended_producers,
    bench_shard_count
);
criterion_main!(benches);
