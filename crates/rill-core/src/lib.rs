#![forbid(unsafe_code)]

//! Push-based reactive streams for in-process event propagation.
//!
//! This crate provides the stream primitives and the combinator algebra:
//!
//! - [`Signal`]: a cheap handle to a broadcast stream of values that never
//!   completes and never fails.
//! - [`Sink`]: the weak write side of exactly one signal.
//! - [`Variable`]: a signal with a current value, replayed to every new
//!   subscriber.
//! - [`DisposeBag`]: a scope of release actions that run exactly once, on
//!   explicit disposal or when the last handle is dropped.
//! - [`MutexCell`]: the mutual-exclusion wrapper all shared state lives in.
//! - [`ObservableExt`]: single-stream operators (`map`, `filter`, `scan`,
//!   `buffered`, `with_latest_from`, ...).
//! - [`merge`], [`combine`], [`zip`], [`traverse`], [`sequence`]: joins over
//!   several streams.
//!
//! # Architecture
//!
//! Every stream-like type implements [`Observable`] (subscribe a callback in a
//! bag) and [`Observer`] (own a default bag). Operators are generic over
//! `Observable`, so signals, variables and sinks compose freely.
//!
//! Ownership flows downstream-to-upstream: an operator's output holds its
//! upstream handles, while the upstream's registry holds only a weak sink
//! back. Dropping the last handle to an output releases its subscriptions and
//! lets the rest of the chain go.
//!
//! # Invariants
//!
//! 1. A subscriber sees only values published after it subscribed, except the
//!    replayed current value of a [`Variable`].
//! 2. Synchronous delivery follows registration order.
//! 3. Releasing a [`DisposeBag`] runs each release action exactly once.
//! 4. No callback runs while a registry lock is held.

pub mod context;
pub mod dispose;
pub mod either;
pub mod error;
pub mod join;
pub mod mutex_cell;
pub mod observable;
pub mod ops;
pub mod signal;
pub mod sink;
pub mod variable;

pub use context::{Context, ExecutionContext, Immediate, Work};
pub use dispose::{DisposeBag, ReleaseAction};
pub use either::Either;
pub use error::{Result, RillError};
pub use join::{combine, merge, sequence, traverse, try_traverse, zip};
pub use mutex_cell::MutexCell;
pub use observable::{Observable, Observer};
pub use ops::ObservableExt;
pub use signal::{Signal, SubscriberToken};
pub use sink::Sink;
pub use variable::Variable;
