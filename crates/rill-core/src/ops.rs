#![forbid(unsafe_code)]

//! Single-stream operators.
//!
//! Every operator reduces to [`ObservableExt::transform`] or its stateful
//! twin [`ObservableExt::transform_with`]: build a new [`Signal`] whose
//! construction subscribes to the upstream and runs a process function for
//! every arrival, writing zero or more values into the downstream [`Sink`].
//!
//! # Operator state
//!
//! Stateful operators own their state exclusively. It lives in a
//! [`MutexCell`] together with the process function, so concurrent
//! publishers are serialized per operator and no state transition is lost.
//! The process function writes its emissions into a local buffer; the cell is
//! released before the buffer is delivered downstream. A subscriber may
//! therefore publish back into the operator's upstream synchronously, and the
//! nested value is processed against the already updated state.
//!
//! Concurrent publishers deliver their own emissions, so subscribers may see
//! the emissions of two threads interleaved differently from the order in
//! which the state evolved.

use tracing::warn;

use crate::context::{Context, ExecutionContext};
use crate::either::Either;
use crate::error::{Result, RillError};
use crate::join::combine;
use crate::mutex_cell::MutexCell;
use crate::observable::{Observable, Observer};
use crate::signal::Signal;
use crate::sink::Sink;
use crate::variable::Variable;

/// Operators available on every [`Observable`].
pub trait ObservableExt: Observable {
    /// Build a signal that runs `process` for every upstream value.
    fn transform<T, F>(&self, process: F) -> Signal<T>
    where
        T: Clone + Send + 'static,
        F: Fn(&Sink<T>, Self::Value) + Send + Sync + 'static,
    {
        Signal::new(|sink| {
            let downstream = sink.clone();
            sink.observe(self, move |value| process(&downstream, value));
        })
    }

    /// [`transform`](Self::transform) with private state threaded through
    /// every call.
    ///
    /// `process` pushes its emissions into the output buffer it is handed.
    /// They are sent downstream, in push order, once the state lock has been
    /// released.
    fn transform_with<S, T, F>(&self, state: S, process: F) -> Signal<T>
    where
        S: Send + 'static,
        T: Clone + Send + 'static,
        F: FnMut(&mut S, &mut Vec<T>, Self::Value) + Send + 'static,
    {
        let cell = MutexCell::new((state, process));
        self.transform(move |sink, value| {
            let emitted = cell.access(|(state, process)| {
                let mut out = Vec::new();
                process(state, &mut out, value);
                out
            });
            for value in emitted {
                sink.send(value);
            }
        })
    }

    /// One output per input.
    fn map<T, F>(&self, transform: F) -> Signal<T>
    where
        T: Clone + Send + 'static,
        F: Fn(Self::Value) -> T + Send + Sync + 'static,
    {
        self.transform(move |sink, value| sink.send(transform(value)))
    }

    /// One output per input, with private state.
    fn map_with<S, T, F>(&self, state: S, mut transform: F) -> Signal<T>
    where
        S: Send + 'static,
        T: Clone + Send + 'static,
        F: FnMut(&mut S, Self::Value) -> T + Send + 'static,
    {
        self.transform_with(state, move |state, out, value| {
            out.push(transform(state, value));
        })
    }

    /// Subscribe to the observable produced for every input and forward all
    /// of its values.
    ///
    /// Inner subscriptions accumulate: an earlier inner observable keeps
    /// forwarding after a later one is produced, for as long as the output
    /// signal lives.
    fn flat_map<O, F>(&self, transform: F) -> Signal<O::Value>
    where
        O: Observable,
        F: Fn(Self::Value) -> O + Send + Sync + 'static,
    {
        self.transform(move |sink, value| sink.forward(&transform(value)))
    }

    /// [`flat_map`](Self::flat_map) with private state.
    fn flat_map_with<S, O, F>(&self, state: S, mut transform: F) -> Signal<O::Value>
    where
        S: Send + 'static,
        O: Observable,
        F: FnMut(&mut S, Self::Value) -> O + Send + 'static,
    {
        let cell = MutexCell::new((state, transform));
        self.transform(move |sink, value| {
            let inner = cell.access(|(state, transform)| transform(state, value));
            sink.forward(&inner);
        })
    }

    /// Pass values for which `predicate` holds.
    fn filter<F>(&self, predicate: F) -> Signal<Self::Value>
    where
        F: Fn(&Self::Value) -> bool + Send + Sync + 'static,
    {
        self.transform(move |sink, value| {
            if predicate(&value) {
                sink.send(value);
            }
        })
    }

    /// Transform and drop the values that map to `None`.
    #[doc(alias = "compact_map")]
    fn filter_map<T, F>(&self, transform: F) -> Signal<T>
    where
        T: Clone + Send + 'static,
        F: Fn(Self::Value) -> Option<T> + Send + Sync + 'static,
    {
        self.transform(move |sink, value| {
            if let Some(value) = transform(value) {
                sink.send(value);
            }
        })
    }

    /// [`filter_map`](Self::filter_map) with private state.
    fn filter_map_with<S, T, F>(&self, state: S, mut transform: F) -> Signal<T>
    where
        S: Send + 'static,
        T: Clone + Send + 'static,
        F: FnMut(&mut S, Self::Value) -> Option<T> + Send + 'static,
    {
        self.transform_with(state, move |state, out, value| {
            out.extend(transform(state, value));
        })
    }

    /// Unwrap `Some` values and drop `None`.
    fn compact<T>(&self) -> Signal<T>
    where
        Self: Observable<Value = Option<T>>,
        T: Clone + Send + 'static,
    {
        self.filter_map(|value| value)
    }

    /// Drop values while `predicate` holds; after the first value that fails
    /// it, pass everything.
    #[doc(alias = "drop_while")]
    fn skip_while<F>(&self, predicate: F) -> Signal<Self::Value>
    where
        F: Fn(&Self::Value) -> bool + Send + 'static,
    {
        self.transform_with(true, move |gating, out, value| {
            if *gating {
                if predicate(&value) {
                    return;
                }
                *gating = false;
            }
            out.push(value);
        })
    }

    /// Pass values while `predicate` holds; after the first value that fails
    /// it, emit nothing ever again.
    #[doc(alias = "prefix_while")]
    fn take_while<F>(&self, predicate: F) -> Signal<Self::Value>
    where
        F: Fn(&Self::Value) -> bool + Send + 'static,
    {
        self.transform_with(true, move |active, out, value| {
            if !*active {
                return;
            }
            if predicate(&value) {
                out.push(value);
            } else {
                *active = false;
            }
        })
    }

    /// Pair every value with the one before it. The first emission carries
    /// `None`.
    fn with_previous(&self) -> Signal<(Option<Self::Value>, Self::Value)> {
        self.map_with(None, |previous: &mut Option<Self::Value>, value: Self::Value| {
            (previous.replace(value.clone()), value)
        })
    }

    /// Suppress a value when `are_equal(value, previous)` holds. The first
    /// value always passes.
    fn distinct_until_changed_by<F>(&self, are_equal: F) -> Signal<Self::Value>
    where
        F: Fn(&Self::Value, &Self::Value) -> bool + Send + Sync + 'static,
    {
        self.with_previous()
            .filter_map(move |(previous, value)| match previous {
                Some(previous) if are_equal(&value, &previous) => None,
                _ => Some(value),
            })
    }

    /// Suppress consecutive duplicates.
    fn distinct_until_changed(&self) -> Signal<Self::Value>
    where
        Self::Value: PartialEq,
    {
        self.distinct_until_changed_by(|a, b| a == b)
    }

    /// Running fold into a [`Variable`] seeded with `state`; every new
    /// subscriber first sees the latest state.
    fn scan_into<S, F>(&self, state: S, mut process: F) -> Variable<S>
    where
        S: Clone + Send + 'static,
        F: FnMut(&mut S, Self::Value) + Send + 'static,
    {
        let states = self.transform_with(state.clone(), move |state, out, value| {
            process(state, value);
            out.push(state.clone());
        });
        Variable::from_signal(&states, state)
    }

    /// Running fold with a pure combining function, as a [`Variable`].
    fn scan<S, F>(&self, seed: S, fold: F) -> Variable<S>
    where
        S: Clone + Send + 'static,
        F: Fn(S, Self::Value) -> S + Send + 'static,
    {
        self.scan_into(seed, move |state, value| {
            *state = fold(state.clone(), value);
        })
    }

    /// Running fold as a plain signal of intermediate states. The seed itself
    /// is not emitted.
    fn scan_signal<S, F>(&self, seed: S, fold: F) -> Signal<S>
    where
        S: Clone + Send + 'static,
        F: Fn(S, Self::Value) -> S + Send + 'static,
    {
        self.transform_with(seed, move |state, out, value| {
            *state = fold(state.clone(), value);
            out.push(state.clone());
        })
    }

    /// Collect values into a batch emitted (and cleared) every time `trigger`
    /// fires. A trigger with nothing buffered emits an empty batch.
    fn buffered_by<O>(&self, trigger: &O) -> Signal<Vec<Self::Value>>
    where
        O: Observable,
    {
        combine(self, trigger).filter_map_with(Vec::new(), |buffer, either| match either {
            Either::Left(value) => {
                buffer.push(value);
                None
            }
            Either::Right(_) => Some(std::mem::take(buffer)),
        })
    }

    /// Emit batches of exactly `count` values. A trailing partial batch is
    /// withheld.
    ///
    /// # Errors
    ///
    /// [`RillError::InvalidBufferCount`] when `count` is zero.
    fn buffered(&self, count: usize) -> Result<Signal<Vec<Self::Value>>> {
        if count == 0 {
            warn!(count, "buffered: count must be positive");
            return Err(RillError::InvalidBufferCount { count });
        }
        Ok(self.filter_map_with(Vec::with_capacity(count), move |buffer, value| {
            buffer.push(value);
            (buffer.len() == count).then(|| std::mem::replace(buffer, Vec::with_capacity(count)))
        }))
    }

    /// Pair every value with the latest value of `companion`. Values that
    /// arrive before the companion's first value are dropped.
    fn with_latest_from<O>(&self, companion: &O) -> Signal<(Self::Value, O::Value)>
    where
        O: Observable,
    {
        combine(self, companion).filter_map_with(None, |latest: &mut Option<O::Value>, either| {
            match either {
                Either::Left(value) => latest.clone().map(|companion| (value, companion)),
                Either::Right(companion) => {
                    *latest = Some(companion);
                    None
                }
            }
        })
    }

    /// Republish every value through `context`.
    fn async_on(&self, context: impl ExecutionContext) -> Signal<Self::Value> {
        let context = Context::new(context);
        self.transform(move |sink, value| {
            let sink = sink.clone();
            context.run(move || sink.send(value));
        })
    }
}

impl<O: Observable> ObservableExt for O {}
