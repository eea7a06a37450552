#![forbid(unsafe_code)]

//! The broadcast primitive.
//!
//! # Design
//!
//! [`Signal<V>`] is a cheap handle around shared, reference-counted state: a
//! registry of subscriber callbacks keyed by [`SubscriberToken`], an optional
//! [`Context`] for delivery, the signal's own [`DisposeBag`], and the
//! upstream handles it keeps alive.
//!
//! Values are published through a [`Sink`], which refers to its signal
//! weakly. An operator's output signal subscribes to its upstream through such
//! a sink, so the upstream never keeps the output alive; only whoever holds
//! the returned `Signal` does. The output, in turn, retains its upstream
//! handles, so a chain built from temporaries stays connected.
//!
//! # Invariants
//!
//! 1. Registry mutation happens under the registry's [`MutexCell`].
//! 2. Every `send` delivers against a snapshot taken under that cell; callbacks
//!    that subscribe or unsubscribe mid-delivery never affect the in-flight
//!    fan-out, and no callback runs while the registry is locked.
//! 3. Without a context, delivery is synchronous and in registration order.
//!    With a context, each callback invocation is handed to it individually.
//! 4. A signal never completes and never fails.
//!
//! # Failure Modes
//!
//! - **Signal dropped while subscribed**: release actions hold the registry
//!   weakly and become no-ops; sinks pointing at it stop delivering.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::context::{Context, ExecutionContext};
use crate::dispose::DisposeBag;
use crate::mutex_cell::MutexCell;
use crate::observable::{Observable, Observer};
use crate::sink::Sink;

// ─── Subscriber tokens ───────────────────────────────────────────────────────

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of one subscription.
///
/// Minted fresh for every `subscribe_in`, so registering the same callback
/// twice yields two independently removable entries. Tokens increase
/// monotonically, which keeps registry iteration in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberToken(u64);

impl SubscriberToken {
    fn mint() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value, for diagnostics.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ─── Shared state ────────────────────────────────────────────────────────────

pub(crate) type Callback<V> = Arc<dyn Fn(V) + Send + Sync + 'static>;

pub(crate) struct SignalInner<V> {
    registry: MutexCell<BTreeMap<SubscriberToken, Callback<V>>>,
    context: Option<Context>,
    /// Subscriptions this signal made to its upstreams. Released before
    /// `lineage` drops the upstream handles.
    bag: DisposeBag,
    lineage: MutexCell<Vec<Box<dyn Any + Send + Sync>>>,
}

impl<V: Clone + Send + 'static> SignalInner<V> {
    fn new(context: Option<Context>) -> Self {
        Self {
            registry: MutexCell::new(BTreeMap::new()),
            context,
            bag: DisposeBag::new(),
            lineage: MutexCell::new(Vec::new()),
        }
    }

    pub(crate) fn send(&self, value: V) {
        self.snapshot().send(value);
    }

    /// Capture the current subscribers without delivering anything.
    pub(crate) fn snapshot(&self) -> Delivery<V> {
        Delivery {
            callbacks: self.registry.access(|registry| registry.values().cloned().collect()),
            context: self.context.clone(),
        }
    }

    pub(crate) fn bag(&self) -> DisposeBag {
        self.bag.clone()
    }

    pub(crate) fn retain(&self, upstream: Box<dyn Any + Send + Sync>) {
        self.lineage.access(|lineage| lineage.push(upstream));
    }
}

/// A fan-out captured under the registry lock, delivered after it is
/// released.
///
/// Lets a caller take the snapshot while it holds a lock of its own and run
/// the callbacks after dropping that lock too.
pub(crate) struct Delivery<V> {
    callbacks: SmallVec<[Callback<V>; 4]>,
    context: Option<Context>,
}

impl<V: Clone + Send + 'static> Delivery<V> {
    pub(crate) fn send(self, value: V) {
        trace!(subscribers = self.callbacks.len(), "signal.send");
        match self.context {
            None => {
                for callback in self.callbacks {
                    callback(value.clone());
                }
            }
            Some(context) => {
                for callback in self.callbacks {
                    let value = value.clone();
                    context.run(move || callback(value));
                }
            }
        }
    }
}

// ─── Signal ──────────────────────────────────────────────────────────────────

/// A multicast stream of values with no terminal state.
///
/// Cloning a `Signal` creates a new handle to the **same** stream. The stream
/// lives until the last handle is dropped.
pub struct Signal<V> {
    inner: Arc<SignalInner<V>>,
}

impl<V> Clone for Signal<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Signal<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.inner.registry.access(|r| r.len()))
            .field("has_context", &self.inner.context.is_some())
            .finish()
    }
}

impl<V: Clone + Send + 'static> Signal<V> {
    fn from_inner(inner: SignalInner<V>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn from_shared(inner: Arc<SignalInner<V>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<SignalInner<V>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn snapshot(&self) -> Delivery<V> {
        self.inner.snapshot()
    }

    /// A signal with no producer wiring. It never emits.
    #[must_use]
    pub fn pending() -> Self {
        Self::from_inner(SignalInner::new(None))
    }

    /// A fresh signal together with the sink that publishes into it.
    #[must_use]
    pub fn make() -> (Self, Sink<V>) {
        let signal = Self::pending();
        let sink = Sink::new(signal.downgrade());
        (signal, sink)
    }

    /// Build a signal by running `work` once, synchronously, with a sink bound
    /// to it. `work` typically wires subscriptions to upstream sources.
    pub fn new(work: impl FnOnce(Sink<V>)) -> Self {
        let signal = Self::pending();
        work(Sink::new(signal.downgrade()));
        signal
    }

    /// Like [`Signal::new`], but every delivery of the resulting signal is
    /// handed to `context`.
    pub fn new_on(context: impl ExecutionContext, work: impl FnOnce(Sink<V>)) -> Self {
        let signal = Self::from_inner(SignalInner::new(Some(Context::new(context))));
        work(Sink::new(signal.downgrade()));
        signal
    }

    /// Build a signal whose `work` runs on `context` instead of inline.
    pub fn spawn_on(
        context: impl ExecutionContext,
        work: impl FnOnce(Sink<V>) + Send + 'static,
    ) -> Self {
        let context = Context::new(context);
        Self::new(move |sink| context.run(move || work(sink)))
    }

    /// A new signal that republishes every value of this one through
    /// `context`. This signal is left untouched.
    #[must_use]
    pub fn change_context(&self, context: impl ExecutionContext) -> Self {
        Self::new_on(context, |sink| sink.forward(self))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.access(|registry| registry.len())
    }
}

impl<V: Clone + Send + 'static> Observable for Signal<V> {
    type Value = V;

    fn subscribe_in<F>(&self, bag: &DisposeBag, handler: F)
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        let token = SubscriberToken::mint();
        let callback: Callback<V> = Arc::new(handler);
        self.inner
            .registry
            .access(|registry| registry.insert(token, callback));
        debug!(token = token.get(), "signal.subscribe");

        let registry = Arc::downgrade(&self.inner);
        bag.add(move || {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            // Drop the callback after the registry lock is released.
            let removed = inner.registry.access(|registry| registry.remove(&token));
            if removed.is_some() {
                debug!(token = token.get(), "signal.unsubscribe");
            }
            drop(removed);
        });
    }
}

impl<V: Clone + Send + 'static> Observer for Signal<V> {
    fn dispose_bag(&self) -> DisposeBag {
        self.inner.bag()
    }

    fn retain_upstream(&self, upstream: Box<dyn Any + Send + Sync>) {
        self.inner.retain(upstream);
    }
}
