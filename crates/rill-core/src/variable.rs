#![forbid(unsafe_code)]

//! Signals with a current value.
//!
//! # Design
//!
//! [`Variable<V>`] pairs a [`MutexCell<V>`] holding the current value with an
//! internal [`Signal`] used purely to broadcast updates. Subscribing replays
//! the current value first, then forwards every later write.
//!
//! The value cell is the only lock a variable owns, and it is never held
//! while a callback runs. A write stores the value and snapshots the
//! subscribers under the cell, then delivers after releasing it. A
//! subscription registers and reads the current value under the cell, then
//! replays after releasing it. Writes that reach a subscriber before its
//! replay has been delivered wait in that subscriber's backlog and are
//! delivered right after the replay.
//!
//! # Invariants
//!
//! 1. `get()` is an atomic read of the cell.
//! 2. `set()` replaces the cell, then publishes the new value.
//! 3. A new subscriber receives the current value synchronously, before
//!    `subscribe_in` returns and before any later write. Every write stored
//!    after the registration reaches it exactly once.
//! 4. No lock of the variable is held during delivery: a callback may read or
//!    write any variable, including the one delivering to it.
//!
//! # Failure Modes
//!
//! - **Concurrent writers**: writes are stored in a total order, but two
//!   threads deliver their writes independently, so a subscriber may observe
//!   them interleaved differently from the stored order. A single writer's
//!   values always arrive in the order written.
//! - **Upstream dropped**: a variable built with [`Variable::from_signal`]
//!   keeps its upstream alive; if every handle to the variable is dropped the
//!   mirroring subscription is released.
//! - **Reading inside `update`**: the closure runs with the cell locked;
//!   calling `get()` from inside it is the re-entrant access hazard described
//!   in [`MutexCell`].

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::dispose::DisposeBag;
use crate::mutex_cell::MutexCell;
use crate::observable::{Observable, Observer};
use crate::signal::Signal;

struct VariableInner<V> {
    value: MutexCell<V>,
    signal: Signal<V>,
}

impl<V: Clone + Send + 'static> VariableInner<V> {
    fn set(&self, value: V) {
        let delivery = self.value.access(|slot| {
            *slot = value.clone();
            self.signal.snapshot()
        });
        delivery.send(value);
    }
}

// ─── Backlog ─────────────────────────────────────────────────────────────────

/// Writes that arrived for a subscriber whose replay is still in flight.
///
/// `None` once the replay and everything queued behind it have been
/// delivered; from then on writes go straight to the handler.
struct Backlog<V> {
    queue: MutexCell<Option<VecDeque<V>>>,
}

impl<V> Backlog<V> {
    fn new() -> Self {
        Self {
            queue: MutexCell::new(Some(VecDeque::new())),
        }
    }

    /// Queue `value` while the replay is pending, otherwise hand it back.
    fn hold(&self, value: V) -> Option<V> {
        self.queue.access(|queue| match queue {
            Some(queue) => {
                queue.push_back(value);
                None
            }
            None => Some(value),
        })
    }

    /// Deliver everything queued, in arrival order, then switch to direct
    /// delivery. Values queued while a batch is being delivered are picked up
    /// by the next round.
    fn drain(&self, handler: impl Fn(V)) {
        loop {
            let batch = self.queue.access(|queue| match queue {
                Some(pending) if pending.is_empty() => {
                    *queue = None;
                    None
                }
                Some(pending) => Some(std::mem::take(pending)),
                None => None,
            });
            let Some(batch) = batch else {
                return;
            };
            for value in batch {
                handler(value);
            }
        }
    }
}

// ─── Variable ────────────────────────────────────────────────────────────────

/// A signal that remembers its latest value and replays it to every new
/// subscriber.
///
/// Cloning a `Variable` creates a new handle to the **same** state.
pub struct Variable<V> {
    inner: Arc<VariableInner<V>>,
}

impl<V> Clone for Variable<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Variable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("value", &self.inner.value)
            .field("signal", &self.inner.signal)
            .finish()
    }
}

impl<V: Clone + Send + 'static> Variable<V> {
    /// A variable holding `value`.
    pub fn new(value: V) -> Self {
        Self {
            inner: Arc::new(VariableInner {
                value: MutexCell::new(value),
                signal: Signal::pending(),
            }),
        }
    }

    /// A variable starting at `initial` that stores and rebroadcasts every
    /// value of `upstream`.
    ///
    /// The mirroring subscription holds the variable weakly and lives in the
    /// variable's own scope.
    pub fn from_signal<O>(upstream: &O, initial: V) -> Self
    where
        O: Observable<Value = V>,
    {
        let variable = Self::new(initial);
        let weak: Weak<VariableInner<V>> = Arc::downgrade(&variable.inner);
        variable.observe(upstream, move |value| {
            if let Some(inner) = weak.upgrade() {
                inner.set(value);
            }
        });
        variable
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> V {
        self.inner.value.get()
    }

    /// Store `value` and publish it.
    pub fn set(&self, value: V) {
        self.inner.set(value);
    }

    /// Modify the current value in place, then publish the result.
    pub fn update(&self, f: impl FnOnce(&mut V)) {
        let (value, delivery) = self.inner.value.access(|value| {
            f(value);
            (value.clone(), self.inner.signal.snapshot())
        });
        delivery.send(value);
    }

    /// Updates only, without the replay of the current value.
    #[must_use]
    pub fn changes(&self) -> Signal<V> {
        self.inner.signal.clone()
    }

    /// A derived variable seeded with `transform` of the current value and
    /// updated with `transform` of every later write.
    pub fn map<T, F>(&self, transform: F) -> Variable<T>
    where
        T: Clone + Send + 'static,
        F: Fn(V) -> T + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        let target: Arc<MutexCell<Weak<VariableInner<T>>>> = Arc::new(MutexCell::new(Weak::new()));
        let forward = {
            let (transform, target) = (Arc::clone(&transform), Arc::clone(&target));
            move |value: V| {
                if let Some(inner) = target.get().upgrade() {
                    inner.set(transform(value));
                }
            }
        };

        let scope = DisposeBag::new();
        let (current, backlog) = self.register(&scope, forward.clone());
        let derived = Variable::new(transform(current));
        target.set(Arc::downgrade(&derived.inner));
        derived.retain_upstream(Box::new(self.clone()));
        derived.dispose_bag().add(move || drop(scope));
        backlog.drain(forward);
        derived
    }

    /// Register `handler` for every later write and read the current value,
    /// atomically with respect to writers. Writes are held in the returned
    /// backlog until the caller drains it.
    fn register<F>(&self, bag: &DisposeBag, handler: F) -> (V, Arc<Backlog<V>>)
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        let backlog = Arc::new(Backlog::new());
        let held = Arc::clone(&backlog);
        let current = self.inner.value.access(|value| {
            self.inner.signal.subscribe_in(bag, move |value| {
                if let Some(value) = held.hold(value) {
                    handler(value);
                }
            });
            value.clone()
        });
        (current, backlog)
    }
}

impl<V: Clone + Send + 'static> Observable for Variable<V> {
    type Value = V;

    fn subscribe_in<F>(&self, bag: &DisposeBag, handler: F)
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let (current, backlog) = {
            let handler = Arc::clone(&handler);
            self.register(bag, move |value| handler(value))
        };
        handler(current);
        backlog.drain(|value| handler(value));
    }
}

impl<V: Clone + Send + 'static> Observer for Variable<V> {
    fn dispose_bag(&self) -> DisposeBag {
        self.inner.signal.dispose_bag()
    }

    fn retain_upstream(&self, upstream: Box<dyn Any + Send + Sync>) {
        self.inner.signal.retain_upstream(upstream);
    }
}
