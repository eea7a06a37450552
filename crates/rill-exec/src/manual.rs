#![forbid(unsafe_code)]

//! A context that queues work until the caller drains it.
//!
//! Useful in tests that need to observe the state between a publish and its
//! deferred delivery.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rill_core::{ExecutionContext, MutexCell, Work};

/// Queue of deferred work, drained explicitly.
///
/// Clones share one queue. Work runs on whichever thread calls
/// [`run_one`](Self::run_one) or [`run_pending`](Self::run_pending), outside
/// the queue lock, so work may enqueue more work.
#[derive(Clone, Default)]
pub struct ManualContext {
    queue: Arc<MutexCell<VecDeque<Work>>>,
}

impl ManualContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.access(|q| q.len())
    }

    /// Run the oldest queued item. Returns `false` when the queue was empty.
    pub fn run_one(&self) -> bool {
        match self.queue.access(VecDeque::pop_front) {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Run queued items until the queue is empty, including items queued
    /// while draining. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl ExecutionContext for ManualContext {
    fn execute(&self, work: Work) {
        self.queue.access(|q| q.push_back(work));
    }
}

impl fmt::Debug for ManualContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualContext")
            .field("pending", &self.pending())
            .finish()
    }
}
