/*!
 * Channel Integration Tests
 *
 * Multi-producer multi-consumer behavior, backpressure and close semantics
 */

use concurrency_toolkit::channel::{
    self, ChannelConfig, RecvError, RecvTimeoutError, SendTimeoutError, TryRecvError,
    TrySendError,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_mpmc_delivers_each_item_exactly_once() {
    let (tx, rx) = channel::bounded::<u32>(16);
    let producers: Vec<_> = (0..4u32)
        .map(|p| {
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    tx.send(p * 1_000 + i).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let rx = rx.clone();
            thread::spawn(move || rx.iter().collect::<Vec<_>>())
        })
        .collect();
    drop(rx);

    for producer in producers {
        producer.join().unwrap();
    }

    let mut seen = HashSet::new();
    for consumer in consumers {
        for item in consumer.join().unwrap() {
            assert!(seen.insert(item), "item {} delivered twice", item);
        }
    }
    assert_eq!(seen.len(), 2_000);
}

#[test]
fn test_per_producer_order_preserved() {
    let (tx, rx) = channel::unbounded::<(u8, u32)>();
    let producers: Vec<_> = (0..3u8)
        .map(|p| {
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..1_000 {
                    tx.send((p, i)).unwrap();
                }
            })
        })
        .collect();
    drop(tx);
    for producer in producers {
        producer.join().unwrap();
    }

    let mut last = [None::<u32>; 3];
    for (p, i) in rx.iter() {
        if let Some(prev) = last[p as usize] {
            assert!(i > prev);
        }
        last[p as usize] = Some(i);
    }
    assert_eq!(last, [Some(999); 3]);
}

#[test]
fn test_bounded_backpressure_blocks_sender() {
    let (tx, rx) = channel::bounded(1);
    tx.send(1).unwrap();
    assert!(tx.is_full());

    let sent = Arc::new(AtomicUsize::new(0));
    let sender_sent = sent.clone();
    let sender = thread::spawn(move || {
        tx.send(2).unwrap();
        sender_sent.store(1, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(30));
    assert_eq!(sent.load(Ordering::SeqCst), 0);

    assert_eq!(rx.recv(), Ok(1));
    sender.join().unwrap();
    assert_eq!(sent.load(Ordering::SeqCst), 1);
    assert_eq!(rx.recv(), Ok(2));
}

#[test]
fn test_close_drains_then_reports_closed() {
    let (tx, rx) = channel::bounded(4);
    tx.send("a").unwrap();
    tx.send("b").unwrap();
    assert!(tx.close());
    assert!(!rx.close());

    assert!(matches!(tx.try_send("c"), Err(TrySendError::Closed("c"))));
    assert_eq!(rx.recv(), Ok("a"));
    assert_eq!(rx.recv(), Ok("b"));
    assert_eq!(rx.recv(), Err(RecvError));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn test_dropping_receivers_fails_blocked_sender() {
    let (tx, rx) = channel::bounded(1);
    tx.send(10).unwrap();

    let sender = thread::spawn(move || tx.send(11));
    thread::sleep(Duration::from_millis(20));
    drop(rx);

    let err = sender.join().unwrap().unwrap_err();
    assert_eq!(err.into_inner(), 11);
}

#[test]
fn test_blocked_receivers_released_by_close() {
    let (tx, rx) = channel::unbounded::<u8>();
    let receivers: Vec<_> = (0..3)
        .map(|_| {
            let rx = rx.clone();
            thread::spawn(move || rx.recv())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    tx.close();

    for receiver in receivers {
        assert_eq!(receiver.join().unwrap(), Err(RecvError));
    }
}

#[test]
fn test_rendezvous_hand_over() {
    let (tx, rx) = channel::rendezvous();
    assert_eq!(tx.capacity(), Some(0));

    // try_send fills the single hand-over slot without waiting
    tx.try_send(1).unwrap();
    assert!(matches!(tx.try_send(2), Err(TrySendError::Full(2))));
    assert_eq!(rx.recv(), Ok(1));

    let receiver = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        rx.recv()
    });

    // Returns only once the receiver has taken the value
    tx.send(5).unwrap();
    assert_eq!(receiver.join().unwrap(), Ok(5));
}

#[test]
fn test_rendezvous_timeout_returns_value() {
    let (tx, rx) = channel::bounded::<String>(0);
    let err = tx
        .send_timeout("unclaimed".to_string(), Duration::from_millis(20))
        .unwrap_err();
    assert!(matches!(err, SendTimeoutError::Timeout(ref v) if v == "unclaimed"));

    // Nothing stays behind in the slot
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_blocking_send_after_timed_out_rendezvous_send() {
    let (tx, rx) = channel::rendezvous();
    assert!(matches!(
        tx.send_timeout(1, Duration::from_millis(10)),
        Err(SendTimeoutError::Timeout(1))
    ));

    let sender_tx = tx.clone();
    let sender = thread::spawn(move || sender_tx.send(2));
    assert_eq!(rx.recv(), Ok(2));

    // The sender must return once its value was taken, not when the channel closes
    let deadline = Instant::now() + Duration::from_secs(2);
    while !sender.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(sender.is_finished(), "blocking send stayed parked after hand-over");
    assert!(sender.join().unwrap().is_ok());
    assert!(!tx.is_closed());
}

#[test]
fn test_close_hands_back_pending_rendezvous_value() {
    let (tx, rx) = channel::rendezvous::<u32>();
    let sender_tx = tx.clone();
    let sender = thread::spawn(move || sender_tx.send_timeout(9, Duration::from_secs(5)));

    while rx.is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    tx.close();

    // No receiver ever ran, so the value must come back
    let err = sender.join().unwrap().unwrap_err();
    assert!(matches!(err, SendTimeoutError::Closed(9)));
    assert_eq!(rx.recv(), Err(RecvError));
}

#[test]
fn test_rendezvous_mixed_senders_deliver_exactly_once() {
    const SENDERS: u32 = 4;
    const PER_SENDER: u32 = 200;

    let (tx, rx) = channel::rendezvous::<u32>();

    let senders: Vec<_> = (0..SENDERS)
        .map(|s| {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut delivered = Vec::new();
                for i in 0..PER_SENDER {
                    let value = s * 10_000 + i;
                    if i % 2 == 0 {
                        // Short deadline: may hand the value back
                        match tx.send_timeout(value, Duration::from_micros(200)) {
                            Ok(()) => delivered.push(value),
                            Err(SendTimeoutError::Timeout(back)) => assert_eq!(back, value),
                            Err(SendTimeoutError::Closed(_)) => panic!("closed early"),
                        }
                    } else {
                        // Generous deadline: must complete
                        tx.send_timeout(value, Duration::from_secs(10)).unwrap();
                        delivered.push(value);
                    }
                }
                delivered
            })
        })
        .collect();
    drop(tx);

    let receivers: Vec<_> = (0..2)
        .map(|r| {
            let rx = rx.clone();
            thread::spawn(move || {
                let mut received = Vec::new();
                while let Ok(value) = rx.recv() {
                    received.push(value);
                    if (received.len() + r) % 7 == 0 {
                        thread::sleep(Duration::from_micros(300));
                    }
                }
                received
            })
        })
        .collect();
    drop(rx);

    let mut delivered = HashSet::new();
    for sender in senders {
        for value in sender.join().unwrap() {
            assert!(delivered.insert(value));
        }
    }

    let mut received = HashSet::new();
    for receiver in receivers {
        for value in receiver.join().unwrap() {
            assert!(received.insert(value), "value {} received twice", value);
        }
    }

    assert!(delivered.len() >= (SENDERS * PER_SENDER / 2) as usize);
    assert_eq!(received, delivered);
}

#[test]
fn test_recv_timeout() {
    let (_tx, rx) = channel::channel::<u8>(ChannelConfig::bounded(2));
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(15)),
        Err(RecvTimeoutError::Timeout)
    );
}

#[test]
fn test_handle_counts() {
    let (tx, rx) = channel::bounded::<()>(1);
    let tx2 = tx.clone();
    let rx2 = rx.clone();
    assert_eq!(tx.sender_count(), 2);
    assert_eq!(rx.receiver_count(), 2);
    assert!(tx.same_channel(&tx2));

    drop(tx2);
    drop(rx2);
    assert_eq!(tx.sender_count(), 1);
    assert_eq!(rx.receiver_count(), 1);
    assert!(!tx.is_closed());

    drop(tx);
    assert!(rx.is_closed());
}

#[test]
fn test_config_json() {
    let config: ChannelConfig =
        serde_json::from_str(r#"{"capacity":{"kind":"bounded","capacity":8}}"#).unwrap();
    assert_eq!(config, ChannelConfig::bounded(8));
    assert!(config.validate().is_ok());
}
