#![forbid(unsafe_code)]

//! Multi-stream joins.
//!
//! # Design
//!
//! [`merge`] forwards both inputs into one sink. [`combine`] tags each side
//! with [`Either`] before merging, which is what lets single-stream operators
//! such as `buffered_by` and `with_latest_from` treat two inputs as one.
//!
//! [`zip`] keeps the latest value of each side in a shared [`MutexCell`].
//! Once both sides have produced, every arrival on either side emits the
//! pair of latest values; neither slot is cleared.
//!
//! [`traverse`] folds a collection through repeated `zip` calls, growing a
//! `Vec` one element at a time.
//!
//! # Invariants
//!
//! 1. `zip` emits nothing until both sides have produced at least once.
//! 2. `traverse` of an empty collection is a signal that never produces.
//! 3. Element order of a `traverse` output matches the input order.
//!
//! # Failure Modes
//!
//! - **Concurrent sides**: two threads publishing into different sides of a
//!   `zip` update the shared slots in some order; each emitted pair reflects
//!   the slots right after its own update, and the delivery happens after
//!   the cell is released.

use std::sync::Arc;

use crate::either::Either;
use crate::mutex_cell::MutexCell;
use crate::observable::{Observable, Observer};
use crate::ops::ObservableExt;
use crate::signal::Signal;

/// Every value of `left` and `right`, in arrival order.
pub fn merge<A, B>(left: &A, right: &B) -> Signal<A::Value>
where
    A: Observable,
    B: Observable<Value = A::Value>,
{
    Signal::new(|sink| {
        sink.forward(left);
        sink.forward(right);
    })
}

/// Every value of `left` and `right`, tagged with its side.
pub fn combine<A, B>(left: &A, right: &B) -> Signal<Either<A::Value, B::Value>>
where
    A: Observable,
    B: Observable,
{
    merge(
        &left.map(Either::<A::Value, B::Value>::Left),
        &right.map(Either::<A::Value, B::Value>::Right),
    )
}

/// Pairs of the latest value from each side, emitted on every arrival once
/// both sides have produced.
pub fn zip<A, B>(left: &A, right: &B) -> Signal<(A::Value, B::Value)>
where
    A: Observable,
    B: Observable,
{
    let latest: Arc<MutexCell<(Option<A::Value>, Option<B::Value>)>> =
        Arc::new(MutexCell::new((None, None)));

    Signal::new(|sink| {
        let (slots, out) = (Arc::clone(&latest), sink.clone());
        sink.observe(left, move |value: A::Value| {
            let pair = slots.access(|(l, r)| {
                *l = Some(value.clone());
                r.clone().map(|r| (value, r))
            });
            if let Some(pair) = pair {
                out.send(pair);
            }
        });

        let (slots, out) = (latest, sink.clone());
        sink.observe(right, move |value: B::Value| {
            let pair = slots.access(|(l, r)| {
                *r = Some(value.clone());
                l.clone().map(|l| (l, value))
            });
            if let Some(pair) = pair {
                out.send(pair);
            }
        });
    })
}

/// Map every item to an observable and zip them all into a signal of
/// vectors, in input order.
pub fn traverse<I, O, F>(items: I, mut transform: F) -> Signal<Vec<O::Value>>
where
    I: IntoIterator,
    O: Observable,
    F: FnMut(I::Item) -> O,
{
    let mut items = items.into_iter();
    let Some(first) = items.next() else {
        return Signal::pending();
    };
    let seed = transform(first).map(|value| vec![value]);
    items.fold(seed, |acc, item| {
        zip(&acc, &transform(item)).map(|(mut values, value)| {
            values.push(value);
            values
        })
    })
}

/// [`traverse`] with a fallible mapping. The first error aborts the
/// traversal and is returned unchanged.
///
/// # Errors
///
/// Whatever `transform` returns for the first failing item.
pub fn try_traverse<I, O, E, F>(items: I, transform: F) -> Result<Signal<Vec<O::Value>>, E>
where
    I: IntoIterator,
    O: Observable,
    F: FnMut(I::Item) -> Result<O, E>,
{
    let observables = items
        .into_iter()
        .map(transform)
        .collect::<Result<Vec<O>, E>>()?;
    Ok(sequence(observables))
}

/// Zip a collection of observables into a signal of vectors.
pub fn sequence<I>(observables: I) -> Signal<Vec<<I::Item as Observable>::Value>>
where
    I: IntoIterator,
    I::Item: Observable,
{
    traverse(observables, |observable| observable)
}
