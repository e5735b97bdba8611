/*!
 * Synchronization Primitives Integration Tests
 *
 * Locks, atomic cells and wait queues under real thread contention
 */

use concurrency_toolkit::core::sync::{StrategyType, SyncConfig, WaitError, WaitQueue};
use concurrency_toolkit::{AtomicCell, ExclusiveLock, OrderingToken, SharedExclusiveLock};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_exclusive_lock_counter() {
    let lock = Arc::new(ExclusiveLock::new(0u64));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let lock = lock.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    *lock.acquire() += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*lock.acquire(), 80_000);
    assert!(!lock.is_locked());
}

#[test]
fn test_exclusive_lock_mutual_exclusion() {
    let lock = Arc::new(ExclusiveLock::new(()));
    let inside = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (lock, inside, violations) = (lock.clone(), inside.clone(), violations.clone());
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let _guard = lock.acquire();
                    if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(violations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_exclusive_lock_timeout_while_held() {
    let lock = Arc::new(ExclusiveLock::new(1));
    let guard = lock.acquire();

    let contender = lock.clone();
    let handle = thread::spawn(move || {
        let start = Instant::now();
        let acquired = contender.acquire_timeout(Duration::from_millis(30)).is_some();
        (acquired, start.elapsed())
    });

    let (acquired, elapsed) = handle.join().unwrap();
    assert!(!acquired);
    assert!(elapsed >= Duration::from_millis(25));
    drop(guard);
    assert!(lock.try_acquire().is_some());
}

#[test]
fn test_poisoned_lock_still_usable() {
    let lock = Arc::new(ExclusiveLock::new(vec![1, 2, 3]));
    let poisoner = lock.clone();
    let result = thread::spawn(move || {
        let mut guard = poisoner.acquire();
        guard.push(4);
        panic!("writer failed mid-update");
    })
    .join();

    assert!(result.is_err());
    assert!(lock.is_poisoned());

    let guard = lock.acquire();
    assert!(guard.is_poisoned());
    assert_eq!(*guard, vec![1, 2, 3, 4]);
    drop(guard);

    lock.clear_poison();
    assert!(!lock.is_poisoned());
}

#[test]
fn test_readers_overlap() {
    let lock = Arc::new(SharedExclusiveLock::new(7));
    let barrier = Arc::new(Barrier::new(4));

    // Every reader holds its guard across the barrier, so all four must be
    // inside at once for the test to finish
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (lock, barrier) = (lock.clone(), barrier.clone());
            thread::spawn(move || {
                let guard = lock.acquire_shared();
                barrier.wait();
                *guard
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 7);
    }
    assert_eq!(lock.shared_count(), 0);
}

#[test]
fn test_writer_not_starved_by_reader_stream() {
    let lock = Arc::new(SharedExclusiveLock::new(0u32));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let (lock, stop) = (lock.clone(), stop.clone());
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let _guard = lock.acquire_shared();
                    thread::sleep(Duration::from_micros(200));
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    let start = Instant::now();
    *lock.acquire() = 1;
    let waited = start.elapsed();

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(waited < Duration::from_secs(1), "writer waited {:?}", waited);
    assert_eq!(*lock.acquire_shared(), 1);
}

#[test]
fn test_shared_exclusive_counter() {
    let lock = Arc::new(SharedExclusiveLock::new(0usize));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let lock = lock.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..1_000 {
                *lock.acquire() += 1;
            }
        }));
    }
    for _ in 0..4 {
        let lock = lock.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..1_000 {
                let value = *lock.acquire_shared();
                assert!(value <= 4_000);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(Arc::try_unwrap(lock).ok().expect("all threads joined").into_inner(), 4_000);
}

#[test]
fn test_atomic_cell_concurrent_fetch_add() {
    let counter = Arc::new(AtomicCell::new(0u64));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    counter.fetch_add(1, OrderingToken::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(counter.load(OrderingToken::SeqCst), 8_000);
}

#[test]
fn test_release_acquire_publication() {
    let data = Arc::new(AtomicCell::new(0u32));
    let ready = Arc::new(AtomicCell::new(false));

    let (producer_data, producer_ready) = (data.clone(), ready.clone());
    let producer = thread::spawn(move || {
        producer_data.store(99, OrderingToken::Relaxed);
        producer_ready.store(true, OrderingToken::Release);
    });

    while !ready.load(OrderingToken::Acquire) {
        std::hint::spin_loop();
    }
    assert_eq!(data.load(OrderingToken::Relaxed), 99);
    producer.join().unwrap();
}

#[test]
fn test_wait_queue_park_single_waiter() {
    let config = SyncConfig {
        strategy: StrategyType::Park,
        ..Default::default()
    };
    let queue = Arc::new(WaitQueue::<u64>::new(config));
    let flag = Arc::new(AtomicBool::new(false));

    let (waiter_queue, waiter_flag) = (queue.clone(), flag.clone());
    let handle = thread::spawn(move || {
        waiter_queue.wait_while(1, Some(Duration::from_secs(2)), || {
            !waiter_flag.load(Ordering::Acquire)
        })
    });

    thread::sleep(Duration::from_millis(20));
    flag.store(true, Ordering::Release);
    queue.wake_one(1);

    assert_eq!(handle.join().unwrap(), Ok(()));
}

#[test]
fn test_wait_queue_spin_wake_all() {
    let queue = Arc::new(WaitQueue::<u64>::new(SyncConfig::low_latency()));
    let go = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let (queue, go) = (queue.clone(), go.clone());
            thread::spawn(move || {
                queue.wait_while(42, Some(Duration::from_secs(2)), || !go.load(Ordering::Acquire))
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    go.store(true, Ordering::Release);
    queue.wake_all(42);

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
}

#[test]
fn test_wait_queue_timeout() {
    let queue = WaitQueue::<u64>::long_wait();
    let start = Instant::now();
    let result = queue.wait_while(9, Some(Duration::from_millis(20)), || true);
    assert_eq!(result, Err(WaitError::Timeout));
    assert!(start.elapsed() >= Duration::from_millis(15));
}
