#![forbid(unsafe_code)]

//! Execution contexts for Rill signals.
//!
//! - [`WorkerContext`]: a dedicated background thread running work in FIFO
//!   order, with a [`wait_idle`](WorkerContext::wait_idle) barrier.
//! - [`ManualContext`]: a queue drained explicitly by the caller.
//!
//! Both implement [`rill_core::ExecutionContext`] and plug into
//! `Signal::new_on`, `Signal::spawn_on`, `Signal::change_context` and
//! `ObservableExt::async_on`.

pub mod config;
pub mod error;
pub mod manual;
pub mod worker;

pub use config::{DEFAULT_THREAD_NAME, WorkerConfig};
pub use error::{ExecError, Result};
pub use manual::ManualContext;
pub use worker::WorkerContext;
