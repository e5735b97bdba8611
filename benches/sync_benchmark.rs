/*!
 * Synchronization Primitives Benchmarks
 *
 * Uncontended lock cost, channel throughput per capacity policy, scheduler
 * fan-out, and wake latency per wait strategy
 */

use concurrency_toolkit::core::sync::{StrategyType, SyncConfig, WaitQueue};
use concurrency_toolkit::{
    channel, ExclusiveLock, RcuCell, SchedulerConfig, SharedExclusiveLock, WorkStealingScheduler,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bench_uncontended_locks(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_lock");

    let exclusive = ExclusiveLock::new(0u64);
    group.bench_function("exclusive", |b| {
        b.iter(|| {
            *exclusive.acquire() += 1;
        })
    });

    let shared = SharedExclusiveLock::new(0u64);
    group.bench_function("shared_read", |b| b.iter(|| black_box(*shared.acquire_shared())));
    group.bench_function("shared_write", |b| {
        b.iter(|| {
            *shared.acquire() += 1;
        })
    });

    let parking_lot_mutex = parking_lot::Mutex::new(0u64);
    group.bench_function("parking_lot_mutex", |b| {
        b.iter(|| {
            *parking_lot_mutex.lock() += 1;
        })
    });

    let rcu = RcuCell::new(0u64);
    group.bench_function("rcu_read", |b| b.iter(|| black_box(*rcu.read())));

    group.finish();
}

fn bench_channel_throughput(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("channel_spsc");
    group.throughput(Throughput::Elements(ITEMS));

    for capacity in [0usize, 1, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("bounded", capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let (tx, rx) = channel::bounded(cap);
                let producer = thread::spawn(move || {
                    for i in 0..ITEMS {
                        tx.send(i).unwrap();
                    }
                });
                let received = rx.iter().count();
                producer.join().unwrap();
                black_box(received)
            });
        });
    }

    group.bench_function("unbounded", |b| {
        b.iter(|| {
            let (tx, rx) = channel::unbounded();
            let producer = thread::spawn(move || {
                for i in 0..ITEMS {
                    tx.send(i).unwrap();
                }
            });
            let received = rx.iter().count();
            producer.join().unwrap();
            black_box(received)
        });
    });

    group.finish();
}

fn bench_scheduler_fan_out(c: &mut Criterion) {
    const TASKS: u64 = 10_000;
    let mut group = c.benchmark_group("scheduler");
    group.throughput(Throughput::Elements(TASKS));
    group.sample_size(20);

    for workers in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("noop_tasks", workers), &workers, |b, &n| {
            b.iter(|| {
                let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(n)).unwrap();
                for _ in 0..TASKS {
                    scheduler.submit(|| {}).unwrap();
                }
                scheduler.shutdown();
                black_box(scheduler.stats().completed)
            });
        });
    }

    group.finish();
}

fn bench_wake_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("wake_latency");

    for strategy in [StrategyType::Park, StrategyType::Spin] {
        let config = SyncConfig {
            strategy,
            spin_duration: Duration::from_micros(10),
            max_spins: 100,
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &config,
            |b, config| {
                b.iter(|| {
                    let queue = Arc::new(WaitQueue::<u64>::new(config.clone()));
                    let flag = Arc::new(AtomicBool::new(false));

                    let (waiter_queue, waiter_flag) = (queue.clone(), flag.clone());
                    let handle = thread::spawn(move || {
                        waiter_queue.wait_while(1, Some(Duration::from_secs(1)), || {
                            !waiter_flag.load(Ordering::Acquire)
                        })
                    });

                    flag.store(true, Ordering::Release);
                    queue.wake_one(1);
                    handle.join().unwrap().ok();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_locks,
    bench_channel_throughput,
    bench_scheduler_fan_out,
    bench_wake_latency
);
criterion_main!(benches);
