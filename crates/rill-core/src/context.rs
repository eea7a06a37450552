#![forbid(unsafe_code)]

//! Execution contexts: the injected "run this later" abstraction.
//!
//! The core never schedules anything by itself. A signal with an attached
//! context hands every delivery to that context; hosts adapt their own
//! scheduler (a worker thread, a pool, an event loop tick) by implementing
//! [`ExecutionContext`]. Any `Fn(Work)` closure qualifies.

use std::fmt;
use std::sync::Arc;

/// A unit of work handed to an [`ExecutionContext`].
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Accepts a unit of work and guarantees it eventually runs.
///
/// Ordering between submitted units is whatever the implementation provides;
/// the core relies on nothing beyond "eventually".
pub trait ExecutionContext: Send + Sync + 'static {
    /// Schedule `work`.
    fn execute(&self, work: Work);
}

impl<F> ExecutionContext for F
where
    F: Fn(Work) + Send + Sync + 'static,
{
    fn execute(&self, work: Work) {
        self(work);
    }
}

/// Shared handle to a type-erased execution context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<dyn ExecutionContext>,
}

impl Context {
    /// Erase `context` behind a shared handle.
    pub fn new(context: impl ExecutionContext) -> Self {
        Self {
            inner: Arc::new(context),
        }
    }

    /// Context that runs work inline on the calling thread.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Immediate)
    }

    /// Schedule a closure.
    pub fn run(&self, work: impl FnOnce() + Send + 'static) {
        self.inner.execute(Box::new(work));
    }
}

impl ExecutionContext for Context {
    fn execute(&self, work: Work) {
        self.inner.execute(work);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

/// Runs work synchronously, before `execute` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ExecutionContext for Immediate {
    fn execute(&self, work: Work) {
        work();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutex_cell::MutexCell;

    #[test]
    fn immediate_runs_inline() {
        let hit = Arc::new(MutexCell::new(false));
        let flag = Arc::clone(&hit);
        Context::immediate().run(move || flag.set(true));
        assert!(hit.get());
    }

    #[test]
    fn closures_are_contexts() {
        let queue: Arc<MutexCell<Vec<Work>>> = Arc::new(MutexCell::new(Vec::new()));
        let sink = Arc::clone(&queue);
        let context = Context::new(move |work: Work| sink.access(|q| q.push(work)));

        let hits = Arc::new(MutexCell::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            context.run(move || hits.access(|n| *n += 1));
        }
        assert_eq!(hits.get(), 0);

        for work in queue.access(std::mem::take) {
            work();
        }
        assert_eq!(hits.get(), 3);
    }
}
