//! Delivery guarantees under concurrent senders.

use actor_runtime::{ActorError, ActorSystem, Message, ShutdownPolicy, SystemSettings};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tagged {
    sender: usize,
    seq: usize,
}

fn test_system(max_actors: usize) -> ActorSystem {
    ActorSystem::with_settings(SystemSettings {
        max_actors,
        default_mailbox_capacity: 16,
        shutdown: ShutdownPolicy {
            drain_poll_interval: Duration::from_millis(5),
            drain_max_attempts: 1_000,
            termination_timeout: Duration::from_secs(10),
        },
    })
}

/// Spin on `ActorMailboxFull` so every message eventually lands
fn send_with_retry(system: &ActorSystem, address: &actor_runtime::Address, message: Message) {
    loop {
        match system.send_message(address, message.clone()) {
            Ok(_) => return,
            Err(ActorError::ActorMailboxFull { .. }) => thread::yield_now(),
            Err(e) => panic!("unexpected send failure: {e}"),
        }
    }
}

#[test_log::test]
fn test_single_sender_fifo() {
    let system = test_system(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let address = {
        let seen = Arc::clone(&seen);
        system
            .register_actor(1_000, move |_ctx, msg| {
                seen.lock().push(*msg.payload::<usize>().unwrap());
                Ok(())
            })
            .unwrap()
    };

    for i in 0..1_000usize {
        system.send_message(&address, Message::new(i)).unwrap();
    }
    assert!(system.shutdown().wait());

    assert_eq!(*seen.lock(), (0..1_000).collect::<Vec<_>>());
}

#[test_log::test]
fn test_per_sender_order_with_concurrent_senders() {
    const SENDERS: usize = 8;
    const PER_SENDER: usize = 500;

    let system = test_system(1);
    let seen = Arc::new(Mutex::new(Vec::with_capacity(SENDERS * PER_SENDER)));

    let address = {
        let seen = Arc::clone(&seen);
        system
            .register_actor(32, move |_ctx, msg| {
                seen.lock().push(*msg.payload::<Tagged>().unwrap());
                Ok(())
            })
            .unwrap()
    };

    let barrier = Arc::new(Barrier::new(SENDERS));
    let senders: Vec<_> = (0..SENDERS)
        .map(|sender| {
            let system = system.clone();
            let address = address.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..PER_SENDER {
                    send_with_retry(&system, &address, Message::new(Tagged { sender, seq }));
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    assert!(system.shutdown().wait());

    let seen = seen.lock();
    assert_eq!(seen.len(), SENDERS * PER_SENDER);

    let mut next: HashMap<usize, usize> = HashMap::new();
    for tagged in seen.iter() {
        let expected = next.entry(tagged.sender).or_insert(0);
        assert_eq!(tagged.seq, *expected, "sender {} out of order", tagged.sender);
        *expected += 1;
    }
}

#[test_log::test]
fn test_many_actors_process_every_accepted_message() {
    const ACTORS: usize = 10;

    let system = test_system(ACTORS);
    let processed = Arc::new(AtomicUsize::new(0));

    let addresses: Vec<_> = (0..ACTORS)
        .map(|_| {
            let processed = Arc::clone(&processed);
            system
                .register_actor(100, move |_ctx, _msg| {
                    processed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    let accepted = Arc::new(AtomicUsize::new(0));
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let system = system.clone();
            let addresses = addresses.clone();
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for i in 0..250 {
                    let target = &addresses[(worker * 31 + i * 7) % addresses.len()];
                    if system.send_message(target, format!("Hello to: {target}")).is_ok() {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(system.shutdown().wait());
    assert_eq!(
        processed.load(Ordering::SeqCst),
        accepted.load(Ordering::SeqCst)
    );
    assert_eq!(system.stats().messages_processed as usize, accepted.load(Ordering::SeqCst));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_handler_sees_send_order(bodies in proptest::collection::vec("[a-z]{1,8}", 1..64)) {
        let system = test_system(1);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let address = {
            let seen = Arc::clone(&seen);
            system
                .register_actor(bodies.len(), move |_ctx, msg| {
                    seen.lock().push(msg.as_text().unwrap_or_default().to_string());
                    Ok(())
                })
                .unwrap()
        };

        for body in &bodies {
            system.send_message(&address, body.clone()).unwrap();
        }
        prop_assert!(system.shutdown().wait());
        prop_assert_eq!(&*seen.lock(), &bodies);
    }
}
