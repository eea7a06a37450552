#![forbid(unsafe_code)]

//! Bindings from streams to host objects.
//!
//! - [`BindingTarget<V>`]: a one-way write endpoint wrapping an action.
//! - [`Reactive<B>`]: a non-owning wrapper around a host `Arc<B>` that mints
//!   binding targets. A target built from it does nothing once the host is
//!   gone, so a binding never extends the host's lifetime.
//! - [`BindExt::bind_to`] and [`ObserverBindExt::bind`]: subscribe a target to
//!   an observable in an explicit or observer-owned scope.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use rill_bind::{BindExt, Reactive};
//! use rill_core::{DisposeBag, Signal};
//!
//! struct Label {
//!     text: Mutex<String>,
//! }
//!
//! let label = Arc::new(Label { text: Mutex::new(String::new()) });
//! let set_text = Reactive::new(&label).bind(|label: &Label, text: String| {
//!     *label.text.lock().unwrap() = text;
//! });
//!
//! let (titles, sink) = Signal::<String>::make();
//! let bag = DisposeBag::new();
//! titles.bind_to(&set_text, &bag);
//!
//! sink.send("hello".to_owned());
//! assert_eq!(*label.text.lock().unwrap(), "hello");
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use rill_core::{DisposeBag, Observable, Observer};
use tracing::trace;

/// A one-way endpoint that accepts values.
pub struct BindingTarget<V> {
    action: Arc<dyn Fn(V) + Send + Sync>,
}

impl<V> Clone for BindingTarget<V> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
        }
    }
}

impl<V> fmt::Debug for BindingTarget<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTarget").finish_non_exhaustive()
    }
}

impl<V> BindingTarget<V> {
    pub fn new(action: impl Fn(V) + Send + Sync + 'static) -> Self {
        Self {
            action: Arc::new(action),
        }
    }

    /// Hand `value` to the target.
    pub fn apply(&self, value: V) {
        (self.action)(value);
    }
}

/// Non-owning handle to a host object, used to build binding targets.
pub struct Reactive<B> {
    base: Weak<B>,
}

impl<B> Clone for Reactive<B> {
    fn clone(&self) -> Self {
        Self {
            base: Weak::clone(&self.base),
        }
    }
}

impl<B> fmt::Debug for Reactive<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("alive", &(self.base.strong_count() > 0))
            .finish()
    }
}

impl<B: Send + Sync + 'static> Reactive<B> {
    #[must_use]
    pub fn new(base: &Arc<B>) -> Self {
        Self {
            base: Arc::downgrade(base),
        }
    }

    /// A target that runs `action` on the host while it is alive.
    pub fn bind<V, F>(&self, action: F) -> BindingTarget<V>
    where
        F: Fn(&B, V) + Send + Sync + 'static,
    {
        let base = Weak::clone(&self.base);
        BindingTarget::new(move |value| match base.upgrade() {
            Some(base) => action(&base, value),
            None => trace!("binding target host dropped"),
        })
    }
}

/// Bind any observable to a [`BindingTarget`].
pub trait BindExt: Observable {
    /// Deliver every value to `target` until `bag` is released.
    fn bind_to(&self, target: &BindingTarget<Self::Value>, bag: &DisposeBag) {
        let target = target.clone();
        self.subscribe_in(bag, move |value| target.apply(value));
    }
}

impl<O: Observable> BindExt for O {}

/// Bind inside an observer's own scope.
pub trait ObserverBindExt: Observer {
    fn bind<O: Observable>(&self, observable: &O, target: &BindingTarget<O::Value>) {
        observable.bind_to(target, &self.dispose_bag());
    }
}

impl<T: Observer + ?Sized> ObserverBindExt for T {}
