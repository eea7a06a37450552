#![forbid(unsafe_code)]

//! Dedicated worker thread.
//!
//! [`WorkerContext`] owns one background thread draining a FIFO channel of
//! work items. It satisfies [`ExecutionContext`], so signals can deliver on
//! it through `Signal::new_on`, `change_context` or `async_on`.
//!
//! # Ordering
//!
//! Work runs one item at a time in submission order. Two values sent through
//! the same signal from one thread are therefore delivered on the worker in
//! the order they were sent.
//!
//! # Failure Modes
//!
//! - **Submission after shutdown**: the work is dropped with a `warn` event.
//! - **Panicking work item**: the worker thread unwinds and exits; later
//!   [`WorkerContext::wait_idle`] calls return [`ExecError::Stopped`], and
//!   joining the thread on shutdown logs a `warn` event naming it.
//! - **Last handle dropped on the worker itself**: the thread is told to
//!   stop but not joined, since a thread cannot join itself.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use rill_core::{ExecutionContext, MutexCell, Work};
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::error::{ExecError, Result};

enum Job {
    Run(Work),
    Idle(mpsc::SyncSender<()>),
    Shutdown,
}

struct WorkerShared {
    name: String,
    sender: mpsc::Sender<Job>,
    thread_id: ThreadId,
    handle: MutexCell<Option<JoinHandle<()>>>,
}

impl WorkerShared {
    fn on_worker(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn stop(&self) {
        let _ = self.sender.send(Job::Shutdown);
        let handle = self.handle.replace(None);
        if self.on_worker() {
            return;
        }
        let Some(handle) = handle else {
            return;
        };
        if handle.join().is_err() {
            warn!(thread = %self.name, "worker thread panicked");
        }
    }
}

impl Drop for WorkerShared {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to a running worker thread.
///
/// Clones share the same thread. The thread stops after the last handle is
/// dropped or [`shutdown`](Self::shutdown) is called, once the work already
/// queued has run.
#[derive(Clone)]
pub struct WorkerContext {
    shared: Arc<WorkerShared>,
}

impl WorkerContext {
    /// Spawn a worker thread configured by `config`.
    ///
    /// # Errors
    ///
    /// [`ExecError::Spawn`] when the operating system refuses the thread.
    pub fn spawn(config: WorkerConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }
        let name = config.thread_name.clone();
        let handle = builder.spawn(move || worker_loop(&name, rx))?;
        debug!(thread = %config.thread_name, "worker.spawn");

        Ok(Self {
            shared: Arc::new(WorkerShared {
                name: config.thread_name,
                sender: tx,
                thread_id: handle.thread().id(),
                handle: MutexCell::new(Some(handle)),
            }),
        })
    }

    /// Spawn a worker with [`WorkerConfig::default`].
    ///
    /// # Errors
    ///
    /// See [`spawn`](Self::spawn).
    pub fn spawn_default() -> Result<Self> {
        Self::spawn(WorkerConfig::default())
    }

    /// Whether the calling thread is this worker.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.shared.on_worker()
    }

    /// Block until every item submitted before this call has run.
    ///
    /// Returns immediately when called from the worker itself.
    ///
    /// # Errors
    ///
    /// [`ExecError::Stopped`] when the worker has exited.
    pub fn wait_idle(&self) -> Result<()> {
        if self.is_current() {
            return Ok(());
        }
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.shared
            .sender
            .send(Job::Idle(done_tx))
            .map_err(|_| ExecError::Stopped)?;
        done_rx.recv().map_err(|_| ExecError::Stopped)
    }

    /// Stop the worker after the queued work has run, and join it.
    ///
    /// Other handles stay valid; work submitted through them afterwards is
    /// dropped.
    pub fn shutdown(&self) {
        self.shared.stop();
    }
}

impl ExecutionContext for WorkerContext {
    fn execute(&self, work: Work) {
        if self.shared.sender.send(Job::Run(work)).is_err() {
            warn!(thread = %self.shared.name, "work submitted to a stopped worker was dropped");
        }
    }
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}

fn worker_loop(name: &str, rx: mpsc::Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Run(work) => work(),
            Job::Idle(done) => {
                let _ = done.send(());
            }
            Job::Shutdown => break,
        }
    }
    debug!(thread = %name, "worker.exit");
}
