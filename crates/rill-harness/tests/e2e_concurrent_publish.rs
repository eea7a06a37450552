//! E2E: concurrent publishers, subscribers and execution contexts.
//!
//! Verifies under real threads:
//! 1. No value is lost when many threads publish into one signal
//! 2. Subscribe/unsubscribe churn during publishing never deadlocks
//! 3. Variable subscribers racing writers still see an unbroken suffix, and
//!    subscribers that write across variables or back through an operator
//!    never deadlock
//! 4. Delivery through a worker preserves per-sender order
//! 5. Scope teardown and worker lifecycle emit their tracing events

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use rill_core::{DisposeBag, MutexCell, Observable, ObservableExt, Signal, Variable};
use rill_exec::{WorkerConfig, WorkerContext};
use rill_harness::Recorder;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

// ── Publishing ──────────────────────────────────────────────────────────

#[test]
fn concurrent_publishers_lose_nothing() {
    let (signal, sink) = Signal::<usize>::make();
    let total = Arc::new(AtomicUsize::new(0));
    let count = Arc::new(AtomicUsize::new(0));
    let bag = DisposeBag::new();
    {
        let (total, count) = (Arc::clone(&total), Arc::clone(&count));
        signal.subscribe_in(&bag, move |v| {
            total.fetch_add(v, Ordering::Relaxed);
            count.fetch_add(1, Ordering::Relaxed);
        });
    }

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let (sink, barrier) = (sink.clone(), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for v in 1..=PER_THREAD {
                    sink.send(v);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(count.load(Ordering::Relaxed), THREADS * PER_THREAD);
    assert_eq!(
        total.load(Ordering::Relaxed),
        THREADS * PER_THREAD * (PER_THREAD + 1) / 2
    );
}

#[test]
fn stateful_operator_serializes_publishers() {
    let (signal, sink) = Signal::<u64>::make();
    let counted = Recorder::attach(&signal.scan_signal(0u64, |acc, _| acc + 1));

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let (sink, barrier) = (sink.clone(), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    sink.send(1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every state transition happened exactly once, whatever order the
    // publishing threads delivered them in.
    let mut states = counted.values();
    states.sort_unstable();
    let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
    assert_eq!(states, expected);
}

#[test]
fn subscription_churn_during_publishing() {
    let (signal, sink) = Signal::<usize>::make();
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let publisher = {
        let (sink, barrier) = (sink.clone(), Arc::clone(&barrier));
        thread::spawn(move || {
            barrier.wait();
            for v in 0..PER_THREAD * 4 {
                sink.send(v);
            }
        })
    };

    let churners: Vec<_> = (0..THREADS)
        .map(|_| {
            let (signal, barrier) = (signal.clone(), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    let bag = DisposeBag::new();
                    signal.subscribe_in(&bag, |v| {
                        std::hint::black_box(v);
                    });
                    drop(bag);
                }
            })
        })
        .collect();

    publisher.join().unwrap();
    for churner in churners {
        churner.join().unwrap();
    }
    assert_eq!(signal.subscriber_count(), 0);
}

// ── Variables ───────────────────────────────────────────────────────────

#[test]
fn variable_subscribers_see_an_unbroken_suffix() {
    let variable = Variable::new(0usize);
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let writer = {
        let (variable, barrier) = (variable.clone(), Arc::clone(&barrier));
        thread::spawn(move || {
            barrier.wait();
            for v in 1..=PER_THREAD {
                variable.set(v);
            }
        })
    };

    let readers: Vec<_> = (0..THREADS)
        .map(|_| {
            let (variable, barrier) = (variable.clone(), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                let recorder = Recorder::attach(&variable);
                thread::yield_now();
                recorder
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        let values = reader.join().unwrap().values();
        let first = values[0];
        let expected: Vec<usize> = (first..=PER_THREAD).collect();
        assert_eq!(values, expected, "replay then every later write, in order");
    }
}

#[test]
fn subscribers_writing_across_variables_do_not_deadlock() {
    let a = Variable::new(0);
    let b = Variable::new(0);
    let barrier = Arc::new(Barrier::new(2));
    let bag = DisposeBag::new();

    for (source, other) in [(&a, &b), (&b, &a)] {
        let (other, barrier) = (other.clone(), Arc::clone(&barrier));
        source.subscribe_in(&bag, move |v| {
            if v == 1 {
                barrier.wait();
                other.set(2);
            }
        });
    }

    let (done_tx, done_rx) = mpsc::channel();
    for variable in [a.clone(), b.clone()] {
        let done = done_tx.clone();
        thread::spawn(move || {
            variable.set(1);
            let _ = done.send(());
        });
    }

    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("cross-writing publishers finished");
    }
    assert_eq!((a.get(), b.get()), (2, 2));
    bag.dispose();
}

#[test]
fn subscriber_feedback_through_an_operator_under_contention() {
    let variable = Variable::new(0u64);
    let normalized = variable.distinct_until_changed();
    let bag = DisposeBag::new();
    {
        let writer = variable.clone();
        normalized.subscribe_in(&bag, move |v| {
            if v % 2 == 1 {
                writer.set(v + 1);
            }
        });
    }

    let barrier = Arc::new(Barrier::new(THREADS));
    let (done_tx, done_rx) = mpsc::channel();
    for t in 0..THREADS {
        let (variable, barrier, done) = (variable.clone(), Arc::clone(&barrier), done_tx.clone());
        thread::spawn(move || {
            barrier.wait();
            for i in 0..PER_THREAD as u64 {
                variable.set((t as u64) * 10_000 + i * 2 + 1);
            }
            let _ = done.send(());
        });
    }

    for _ in 0..THREADS {
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("publishers with write-back subscribers finished");
    }
    bag.dispose();
}

// ── Worker delivery ─────────────────────────────────────────────────────

#[test]
fn worker_delivery_preserves_sender_order() {
    let worker = WorkerContext::spawn(WorkerConfig::default().with_thread_name("rill-e2e")).unwrap();
    let (signal, sink) = Signal::<usize>::make();
    let recorder = Recorder::attach(&signal.async_on(worker.clone()));

    for v in 0..PER_THREAD {
        sink.send(v);
    }
    worker.wait_idle().unwrap();

    assert_eq!(recorder.values(), (0..PER_THREAD).collect::<Vec<_>>());
    worker.shutdown();
}

#[test]
fn change_context_delivers_every_subscriber_on_the_worker() {
    let worker = WorkerContext::spawn_default().unwrap();
    let (signal, sink) = Signal::<u8>::make();
    let moved = signal.change_context(worker.clone());

    let names = Arc::new(MutexCell::new(Vec::new()));
    let bag = DisposeBag::new();
    for _ in 0..3 {
        let names = Arc::clone(&names);
        moved.subscribe_in(&bag, move |_| {
            let name = thread::current().name().map(str::to_owned);
            names.access(|n| n.push(name));
        });
    }

    sink.send(1);
    worker.wait_idle().unwrap();
    assert_eq!(names.get(), vec![Some("rill-worker".to_owned()); 3]);
}

// ── Tracing ─────────────────────────────────────────────────────────────

mod tracing_capture {
    use super::*;
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[derive(Default)]
    pub struct Seen {
        pub messages: Vec<String>,
        pub dispose_actions: Vec<u64>,
    }

    pub struct Capture {
        pub seen: Arc<Mutex<Seen>>,
    }

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Fields {
                message: Option<String>,
                actions: Option<u64>,
            }
            impl tracing::field::Visit for Fields {
                fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
                    if field.name() == "actions" {
                        self.actions = Some(value);
                    }
                }

                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                    }
                }
            }
            let mut fields = Fields {
                message: None,
                actions: None,
            };
            event.record(&mut fields);
            let mut seen = self.seen.lock().expect("capture lock");
            if let Some(message) = fields.message {
                if message == "dispose_bag.dispose" {
                    seen.dispose_actions.extend(fields.actions);
                }
                seen.messages.push(message);
            }
        }
    }

    #[test]
    fn teardown_and_worker_lifecycle_are_traced() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let subscriber = tracing_subscriber::registry().with(Capture {
            seen: Arc::clone(&seen),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let (signal, _sink) = Signal::<i32>::make();
        let bag = DisposeBag::new();
        signal.subscribe_in(&bag, |_| {});
        signal.subscribe_in(&bag, |_| {});
        bag.dispose();

        let worker = WorkerContext::spawn_default().unwrap();
        worker.shutdown();

        let seen = seen.lock().expect("capture lock");
        assert!(seen.messages.iter().any(|m| m == "signal.subscribe"));
        assert!(seen.messages.iter().any(|m| m == "signal.unsubscribe"));
        assert_eq!(seen.dispose_actions, vec![2]);
        assert!(seen.messages.iter().any(|m| m == "worker.spawn"));
    }
}
