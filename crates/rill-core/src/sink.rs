#![forbid(unsafe_code)]

//! Publish endpoints.
//!
//! A [`Sink<V>`] is the write side of exactly one [`Signal<V>`], fixed at
//! construction. It refers to the signal weakly: once every `Signal` handle
//! is gone, sending through the sink does nothing.

use std::any::Any;
use std::fmt;
use std::sync::Weak;

use crate::dispose::DisposeBag;
use crate::observable::{Observable, Observer};
use crate::signal::{Signal, SignalInner};

/// Weak write handle for a [`Signal`].
pub struct Sink<V> {
    signal: Weak<SignalInner<V>>,
}

impl<V> Clone for Sink<V> {
    fn clone(&self) -> Self {
        Self {
            signal: Weak::clone(&self.signal),
        }
    }
}

impl<V> fmt::Debug for Sink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("alive", &(self.signal.strong_count() > 0))
            .finish()
    }
}

impl<V: Clone + Send + 'static> Sink<V> {
    pub(crate) fn new(signal: Weak<SignalInner<V>>) -> Self {
        Self { signal }
    }

    /// A sink whose signal no longer exists. Every send is a no-op.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Weak::new())
    }

    /// Publish `value` if the signal is still alive.
    pub fn send(&self, value: V) {
        if let Some(signal) = self.signal.upgrade() {
            signal.send(value);
        }
    }

    /// Whether the bound signal still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.signal.strong_count() > 0
    }

    /// Forward every value of `observable` into this sink for as long as the
    /// bound signal lives.
    pub fn forward<O>(&self, observable: &O)
    where
        O: Observable<Value = V>,
    {
        let sink = self.clone();
        self.observe(observable, move |value| sink.send(value));
    }
}

impl Sink<()> {
    /// Publish the unit value.
    pub fn fire(&self) {
        self.send(());
    }
}

impl<V: Clone + Send + 'static> Observer for Sink<V> {
    /// The bound signal's scope, or a fresh scope that releases immediately
    /// when the signal is gone.
    fn dispose_bag(&self) -> DisposeBag {
        match self.signal.upgrade() {
            Some(signal) => signal.bag(),
            None => DisposeBag::new(),
        }
    }

    fn retain_upstream(&self, upstream: Box<dyn Any + Send + Sync>) {
        if let Some(signal) = self.signal.upgrade() {
            signal.retain(upstream);
        }
    }
}

impl<V: Clone + Send + 'static> Observable for Sink<V> {
    type Value = V;

    /// Subscribes to the bound signal. A detached sink never produces.
    fn subscribe_in<F>(&self, bag: &DisposeBag, handler: F)
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        if let Some(inner) = self.signal.upgrade() {
            Signal::from_shared(inner).subscribe_in(bag, handler);
        }
    }
}
