use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use trade_core::config::{MpmcConfig, PoolConfig, SpscConfig};
use trade_core::{Mpmc, Pool, Spsc};

const MSG_PER_PRODUCER: u64 = 2_000_000;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    group.bench_function("single_producer_consumer", |b| {
        b.iter(|| {
            let queue = Arc::new(Spsc::<u64>::new(SpscConfig::new(4096)));
            let producer_q = queue.clone();
            let producer = thread::spawn(move || {
                let mut sent = 0u64;
                while sent < MSG_PER_PRODUCER {
                    if producer_q.push(sent).is_ok() {
                        sent += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0u64;
            while received < MSG_PER_PRODUCER {
                if let Some(v) = queue.pop() {
                    black_box(v);
                    received += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");

    for num_producers in [2, 4, 8] {
        let total_msgs = MSG_PER_PRODUCER * num_producers as u64;
        group.throughput(Throughput::Elements(total_msgs));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_producers}P_{num_producers}C")),
            &num_producers,
            |b, &n| {
                b.iter(|| {
                    let queue = Arc::new(Mpmc::<u64>::new(MpmcConfig::new(4096)));
                    let received = Arc::new(AtomicU64::new(0));

                    let producers: Vec<_> = (0..n)
                        .map(|_| {
                            let q = queue.clone();
                            thread::spawn(move || {
                                let mut sent = 0u64;
                                while sent < MSG_PER_PRODUCER {
                                    if q.enqueue(sent).is_ok() {
                                        sent += 1;
                                    } else {
                                        std::hint::spin_loop();
                                    }
                                }
                            })
                        })
                        .collect();

                    let consumers: Vec<_> = (0..n)
                        .map(|_| {
                            let q = queue.clone();
                            let received = received.clone();
                            thread::spawn(move || {
                                while received.load(Ordering::Relaxed) < total_msgs {
                                    if let Some(v) = q.dequeue() {
                                        black_box(v);
                                        received.fetch_add(1, Ordering::Relaxed);
                                    } else {
                                        std::hint::spin_loop();
                                    }
                                }
                            })
                        })
                        .collect();

                    for p in producers {
                        p.join().unwrap();
                    }
                    for c in consumers {
                        c.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(1));

    group.bench_function("acquire_release", |b| {
        let pool = Pool::new(PoolConfig::new(64, 4096));
        b.iter(|| {
            let ptr = pool.acquire().unwrap();
            black_box(ptr);
            pool.release(ptr);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpmc, bench_pool);
criterion_main!(benches);
