#![forbid(unsafe_code)]

//! Lifetime scopes for subscriptions.
//!
//! A [`DisposeBag`] owns release actions. Every subscription registers one
//! action that removes its entry from the source signal's registry; the
//! actions run when the bag is released, either explicitly through
//! [`DisposeBag::dispose`] or when the last handle is dropped.
//!
//! # Invariants
//!
//! 1. Each action runs exactly once. Releasing an already-released bag is a
//!    no-op.
//! 2. There is no way to remove a single action; teardown is all-or-nothing.
//! 3. An action added to a bag that has already been released runs
//!    immediately, so a subscription made in a dead scope never stays live.
//! 4. Actions run outside the bag's lock, so an action may drop other bags
//!    or signals without deadlocking.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::mutex_cell::MutexCell;

/// A release action owned by a [`DisposeBag`].
pub type ReleaseAction = Box<dyn FnOnce() + Send + 'static>;

struct BagInner {
    /// `None` once the bag has been released.
    actions: MutexCell<Option<Vec<ReleaseAction>>>,
}

impl BagInner {
    fn release(&self) {
        let Some(actions) = self.actions.access(Option::take) else {
            return;
        };
        debug!(actions = actions.len(), "dispose_bag.dispose");
        for action in actions {
            action();
        }
    }
}

impl Drop for BagInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// An owner of subscription release actions.
///
/// Cloning a `DisposeBag` creates a new handle to the **same** scope; the
/// actions run when the last handle is dropped, or earlier through
/// [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct DisposeBag {
    inner: Arc<BagInner>,
}

impl DisposeBag {
    /// Create an empty, live scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BagInner {
                actions: MutexCell::new(Some(Vec::new())),
            }),
        }
    }

    /// Register a release action.
    ///
    /// If the bag has already been released the action runs right away.
    pub fn add(&self, action: impl FnOnce() + Send + 'static) {
        let rejected = self.inner.actions.access(|slot| match slot {
            Some(actions) => {
                actions.push(Box::new(action));
                None
            }
            None => Some(action),
        });
        if let Some(action) = rejected {
            action();
        }
    }

    /// Run every registered action now. Idempotent.
    pub fn dispose(&self) {
        self.inner.release();
    }

    /// Whether the scope has been released.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.actions.access(|slot| slot.is_none())
    }

    /// Number of actions waiting for release.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .actions
            .access(|slot| slot.as_ref().map_or(0, Vec::len))
    }

    /// Whether no actions are waiting for release.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DisposeBag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeBag")
            .field("pending", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
