#![forbid(unsafe_code)]

//! Test helpers for code built on Rill streams.
//!
//! - [`Recorder`]: collects every value an observable produces.
//! - [`ProduceExt::assert_will_produce`]: run a block and assert the exact
//!   sequence it caused an observable to produce.

use std::fmt;
use std::sync::Arc;

use rill_core::{DisposeBag, MutexCell, Observable};

/// Collects the values produced by an observable, in delivery order.
///
/// The recorder keeps its source alive and subscribed for as long as it
/// lives, so it can be attached to a temporary pipeline.
pub struct Recorder<V> {
    values: Arc<MutexCell<Vec<V>>>,
    _bag: DisposeBag,
}

impl<V: Clone + Send + 'static> Recorder<V> {
    pub fn attach<O: Observable<Value = V>>(observable: &O) -> Self {
        let bag = DisposeBag::new();
        let values = Arc::new(MutexCell::new(Vec::new()));
        let out = Arc::clone(&values);
        observable.subscribe_in(&bag, move |value| out.access(|values| values.push(value)));
        let source = observable.clone();
        bag.add(move || drop(source));
        Self { values, _bag: bag }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.values.get()
    }

    #[must_use]
    pub fn last(&self) -> Option<V> {
        self.values.access(|values| values.last().cloned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.access(|values| values.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + fmt::Debug + 'static> fmt::Debug for Recorder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("values", &self.values.get())
            .finish()
    }
}

/// Assertion sugar over [`Recorder`].
pub trait ProduceExt: Observable
where
    Self::Value: PartialEq + fmt::Debug,
{
    /// Record this observable while `block` runs and assert it produced
    /// exactly `expected`.
    ///
    /// # Panics
    ///
    /// When the recorded values differ from `expected`.
    #[track_caller]
    fn assert_will_produce(&self, expected: &[Self::Value], block: impl FnOnce()) {
        let recorder = Recorder::attach(self);
        block();
        assert_eq!(recorder.values(), expected);
    }
}

impl<O> ProduceExt for O
where
    O: Observable,
    O::Value: PartialEq + fmt::Debug,
{
}
