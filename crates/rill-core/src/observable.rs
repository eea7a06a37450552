#![forbid(unsafe_code)]

//! The two capabilities every stream-like type provides.
//!
//! - [`Observable`]: "a callback registered with a [`DisposeBag`] is invoked
//!   for every value produced from now on, until the bag is released."
//! - [`Observer`]: "I own a default [`DisposeBag`]", so subscriptions can be
//!   made without naming a scope.
//!
//! Combinators in [`crate::ops`] and [`crate::join`] are generic over any
//! `Observable`, so [`Signal`](crate::Signal), [`Variable`](crate::Variable)
//! and [`Sink`](crate::Sink) compose interchangeably.

use std::any::Any;

use crate::dispose::DisposeBag;

/// A source of values that callbacks can subscribe to.
///
/// Implementors are cheap handles: cloning yields another handle to the same
/// source.
pub trait Observable: Clone + Send + Sync + 'static {
    /// Type of the produced values.
    type Value: Clone + Send + 'static;

    /// Register `handler` for every future value. The subscription lives
    /// until `bag` is released.
    fn subscribe_in<F>(&self, bag: &DisposeBag, handler: F)
    where
        F: Fn(Self::Value) + Send + Sync + 'static;
}

/// Owner of a default subscription scope.
pub trait Observer {
    /// The scope that subscriptions made through this observer live in.
    fn dispose_bag(&self) -> DisposeBag;

    /// Keep `upstream` alive for as long as this observer's scope is live.
    ///
    /// The default does nothing; signal-backed observers hold on to the
    /// handle so pipelines built from temporaries keep working.
    fn retain_upstream(&self, upstream: Box<dyn Any + Send + Sync>) {
        drop(upstream);
    }

    /// Subscribe `handler` to `observable` inside [`Self::dispose_bag`].
    fn observe<O, F>(&self, observable: &O, handler: F)
    where
        O: Observable,
        F: Fn(O::Value) + Send + Sync + 'static,
    {
        self.retain_upstream(Box::new(observable.clone()));
        observable.subscribe_in(&self.dispose_bag(), handler);
    }
}
