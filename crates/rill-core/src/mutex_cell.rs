#![forbid(unsafe_code)]

//! A value holder whose every read and read-modify-write runs inside one
//! exclusion domain.
//!
//! # Invariants
//!
//! 1. Every observation or mutation of the held value happens while the lock
//!    is held.
//! 2. The lock is not reentrant. Calling [`MutexCell::access`] (or any of the
//!    sugar built on it) from inside an active `access` block on the same cell
//!    deadlocks.
//!
//! # Failure Modes
//!
//! - **Re-entrant access**: in debug builds the cell remembers which thread
//!   holds it and panics with a message naming the hazard instead of hanging.
//!   Release builds keep the plain lock.
//! - **Panic inside a block**: `parking_lot` locks do not poison, so the next
//!   caller sees whatever state the block left behind.

use std::fmt;

use parking_lot::Mutex;

#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(debug_assertions)]
static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

#[cfg(debug_assertions)]
thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

#[cfg(debug_assertions)]
fn thread_tag() -> u64 {
    THREAD_TAG.with(|tag| *tag)
}

/// Serialized access to a single value of type `V`.
pub struct MutexCell<V> {
    value: Mutex<V>,
    /// Tag of the thread currently inside `access`, 0 when free.
    #[cfg(debug_assertions)]
    owner: AtomicU64,
}

impl<V> MutexCell<V> {
    /// Wrap `value` in a fresh exclusion domain.
    pub fn new(value: V) -> Self {
        Self {
            value: Mutex::new(value),
            #[cfg(debug_assertions)]
            owner: AtomicU64::new(0),
        }
    }

    /// Run `block` with exclusive access to the held value and return its
    /// result.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the calling thread is already inside an
    /// `access` block on this cell.
    pub fn access<T>(&self, block: impl FnOnce(&mut V) -> T) -> T {
        #[cfg(debug_assertions)]
        let tag = {
            let tag = thread_tag();
            assert_ne!(
                self.owner.load(Ordering::Acquire),
                tag,
                "re-entrant MutexCell::access on the same thread would deadlock"
            );
            tag
        };

        let mut guard = self.value.lock();

        #[cfg(debug_assertions)]
        let _owner = OwnerMark::set(&self.owner, tag);

        block(&mut guard)
    }

    /// Replace the held value, returning the previous one.
    pub fn replace(&self, value: V) -> V {
        self.access(|slot| std::mem::replace(slot, value))
    }

    /// Overwrite the held value.
    pub fn set(&self, value: V) {
        drop(self.replace(value));
    }

    /// Consume the cell and return the held value.
    pub fn into_inner(self) -> V {
        self.value.into_inner()
    }
}

impl<V: Clone> MutexCell<V> {
    /// Clone the held value out of the cell.
    #[must_use]
    pub fn get(&self) -> V {
        self.access(|value| value.clone())
    }
}

impl<V: Default> Default for MutexCell<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for MutexCell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.try_lock() {
            Some(value) => f.debug_struct("MutexCell").field("value", &*value).finish(),
            None => f.debug_struct("MutexCell").field("value", &"<locked>").finish(),
        }
    }
}

/// Clears the owner tag when the access block exits, including by unwinding.
#[cfg(debug_assertions)]
struct OwnerMark<'a> {
    owner: &'a AtomicU64,
}

#[cfg(debug_assertions)]
impl<'a> OwnerMark<'a> {
    fn set(owner: &'a AtomicU64, tag: u64) -> Self {
        owner.store(tag, Ordering::Release);
        Self { owner }
    }
}

#[cfg(debug_assertions)]
impl Drop for OwnerMark<'_> {
    fn drop(&mut self) {
        self.owner.store(0, Ordering::Release);
    }
}
