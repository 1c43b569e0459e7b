use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use coalesce_ring::{Config, Queue};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const ITEMS_PER_PRODUCER: u64 = 200_000;

fn bench_single_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmc_single_producer");
    group.throughput(Throughput::Elements(ITEMS_PER_PRODUCER));

    group.bench_function("put_then_drain", |b| {
        b.iter(|| {
            let queue = Arc::new(Queue::<u64>::new(Config::new(4096)));

            let producer_queue = Arc::clone(&queue);
            let producer = thread::spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    producer_queue.put(i).unwrap();
                }
                producer_queue.close();
            });

            let mut drained = 0u64;
            loop {
                match queue.drain_batch(4096, None) {
                    coalesce_ring::Drained::Items(items) => {
                        drained += items.len() as u64;
                        black_box(&items);
                    }
                    coalesce_ring::Drained::Closed => break,
                    coalesce_ring::Drained::TimedOut => unreachable!("indefinite wait"),
                }
            }
            producer.join().unwrap();
            assert_eq!(drained, ITEMS_PER_PRODUCER);
        });
    });

    group.finish();
}

fn bench_multi_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc_multi_producer");

    for producers in [2usize, 4, 8] {
        let total = ITEMS_PER_PRODUCER * producers as u64;
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{producers}P_1C")),
            &producers,
            |b, &producers| {
                b.iter_custom(|iters| {
                    let mut total_elapsed = std::time::Duration::ZERO;
                    for _ in 0..iters {
                        let queue = Arc::new(Queue::<u64>::new(Config::new(4096)));
                        let start = Instant::now();

                        let handles: Vec<_> = (0..producers)
                            .map(|_| {
                                let queue = Arc::clone(&queue);
                                thread::spawn(move || {
                                    for i in 0..ITEMS_PER_PRODUCER {
                                        queue.put(i).unwrap();
                                    }
                                })
                            })
                            .collect();

                        let mut drained = 0u64;
                        let expected = ITEMS_PER_PRODUCER * producers as u64;
                        while drained < expected {
                            if let coalesce_ring::Drained::Items(items) =
                                queue.drain_batch(4096, None)
                            {
                                drained += items.len() as u64;
                                black_box(&items);
                            }
                        }
                        for h in handles {
                            h.join().unwrap();
                        }
                        total_elapsed += start.elapsed();
                    }
                    total_elapsed
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_producer, bench_multi_producer);
criterion_main!(benches);
