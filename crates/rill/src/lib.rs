#![forbid(unsafe_code)]

//! Rill public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use rill::prelude::*;
//!
//! let (clicks, sink) = Signal::<()>::make();
//! let count = clicks.scan(0u32, |n, ()| n + 1);
//!
//! sink.fire();
//! sink.fire();
//! assert_eq!(count.get(), 2);
//! ```

#[cfg(feature = "bind")]
pub use rill_bind as bind;
#[cfg(feature = "exec")]
pub use rill_exec as exec;

pub use rill_core::{
    Context, DisposeBag, Either, ExecutionContext, Immediate, MutexCell, Observable,
    ObservableExt, Observer, Result, RillError, Signal, Sink, Variable, combine, merge, sequence,
    traverse, try_traverse, zip,
};

pub mod prelude {
    pub use rill_core::{
        DisposeBag, Either, Observable, ObservableExt, Observer, Signal, Sink, Variable, combine,
        merge, sequence, traverse, zip,
    };

    #[cfg(feature = "bind")]
    pub use rill_bind::{BindExt, BindingTarget, ObserverBindExt, Reactive};
    #[cfg(feature = "exec")]
    pub use rill_exec::{ManualContext, WorkerConfig, WorkerContext};
}
