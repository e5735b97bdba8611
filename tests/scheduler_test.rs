/*!
 * Work-Stealing Scheduler Integration Tests
 */

use concurrency_toolkit::scheduler::{ThreadSpawner, WorkerBody};
use concurrency_toolkit::{
    current_worker_index, channel, SchedulerConfig, SchedulerError, TaskError, VictimPolicy,
    WorkStealingScheduler,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[test]
fn test_ten_thousand_noop_tasks() {
    let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(4)).unwrap();
    let executed = Arc::new(Mutex::new(Vec::with_capacity(10_000)));

    for id in 0..10_000u32 {
        let executed = executed.clone();
        scheduler
            .submit(move || executed.lock().unwrap().push(id))
            .unwrap();
    }
    scheduler.shutdown();

    let executed = executed.lock().unwrap();
    assert_eq!(executed.len(), 10_000);
    let unique: HashSet<_> = executed.iter().copied().collect();
    assert_eq!(unique.len(), 10_000);

    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 10_000);
    assert_eq!(stats.completed, 10_000);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.outstanding(), 0);
}

#[test]
fn test_failed_task_does_not_stop_siblings() {
    let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(2)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 0..20 {
        let counter = counter.clone();
        scheduler
            .submit(move || {
                if i % 5 == 0 {
                    panic!("task {} failed", i);
                }
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }
    scheduler.shutdown();

    assert_eq!(counter.load(Ordering::Relaxed), 16);
    let stats = scheduler.stats();
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.completed, 16);
}

#[test]
fn test_result_handles() {
    let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(3)).unwrap();
    let handles: Vec<_> = (0..50u64)
        .map(|n| scheduler.submit_with_result(move || n * n).unwrap())
        .collect();

    let sum: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(sum, (0..50u64).map(|n| n * n).sum::<u64>());

    let failing = scheduler
        .submit_with_result(|| -> u8 { panic!("{}", String::from("owned message")) })
        .unwrap();
    assert_eq!(
        failing.join(),
        Err(TaskError::Panicked("owned message".to_string()))
    );
}

#[test]
fn test_recursive_fan_out_drains_on_shutdown() {
    fn fan_out(scheduler: Arc<WorkStealingScheduler>, depth: u32, leaves: Arc<AtomicUsize>) {
        if depth == 0 {
            leaves.fetch_add(1, Ordering::Relaxed);
            return;
        }
        for _ in 0..2 {
            let (scheduler_child, leaves) = (scheduler.clone(), leaves.clone());
            scheduler
                .submit(move || fan_out(scheduler_child, depth - 1, leaves))
                .unwrap();
        }
    }

    let scheduler = Arc::new(
        WorkStealingScheduler::builder()
            .workers(4)
            .local_capacity(8)
            .build()
            .unwrap(),
    );
    let leaves = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = channel::bounded(1);

    let (root_scheduler, root_leaves) = (scheduler.clone(), leaves.clone());
    scheduler
        .submit(move || {
            started_tx.send(()).unwrap();
            fan_out(root_scheduler, 10, root_leaves);
        })
        .unwrap();

    // Shut down while the tree is still being expanded
    started_rx.recv().unwrap();
    scheduler.shutdown();

    assert_eq!(leaves.load(Ordering::Relaxed), 1 << 10);
    assert!(matches!(scheduler.submit(|| {}), Err(SchedulerError::ShutDown)));
}

#[test]
fn test_work_is_spread_by_stealing() {
    let scheduler = Arc::new(
        WorkStealingScheduler::builder()
            .workers(4)
            .victim_policy(VictimPolicy::RoundRobin)
            .build()
            .unwrap(),
    );
    let workers_seen = Arc::new(Mutex::new(HashSet::new()));

    // A single parent pushes every child onto its own deque
    let (parent_scheduler, seen) = (scheduler.clone(), workers_seen.clone());
    scheduler
        .submit(move || {
            for _ in 0..64 {
                let seen = seen.clone();
                parent_scheduler
                    .submit(move || {
                        thread::sleep(Duration::from_millis(2));
                        if let Some(index) = current_worker_index() {
                            seen.lock().unwrap().insert(index);
                        }
                    })
                    .unwrap();
            }
        })
        .unwrap();

    while scheduler.stats().submitted < 65 {
        thread::sleep(Duration::from_millis(1));
    }
    scheduler.shutdown();

    assert!(workers_seen.lock().unwrap().len() > 1);
    assert!(scheduler.stats().stolen > 0);
}

#[test]
fn test_not_on_worker_outside_pool() {
    assert_eq!(current_worker_index(), None);
}

struct CountingSpawner {
    spawned: AtomicUsize,
    fail_after: usize,
}

impl ThreadSpawner for CountingSpawner {
    fn spawn(&self, name: String, body: WorkerBody) -> io::Result<JoinHandle<()>> {
        if self.spawned.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"));
        }
        thread::Builder::new().name(name).spawn(body)
    }
}

#[test]
fn test_partial_spawn_failure_cleans_up() {
    let result = WorkStealingScheduler::builder()
        .workers(4)
        .spawner(CountingSpawner {
            spawned: AtomicUsize::new(0),
            fail_after: 2,
        })
        .build();

    match result {
        Err(SchedulerError::Spawn(message)) => assert!(message.contains("thread limit")),
        other => panic!("expected spawn failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_config_from_json() {
    let config: SchedulerConfig =
        serde_json::from_str(r#"{"workers":2,"injector_capacity":64,"thread_name":"json-pool"}"#)
            .unwrap();
    let scheduler = WorkStealingScheduler::new(config).unwrap();
    assert_eq!(scheduler.workers(), 2);

    let name = scheduler
        .submit_with_result(|| thread::current().name().map(str::to_owned))
        .unwrap()
        .join()
        .unwrap();
    assert!(name.unwrap().starts_with("json-pool-"));
}
