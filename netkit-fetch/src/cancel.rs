//! Cancellation handles.
//!
//! Every fetch returns a [`CancelableBag`]. The bag collects the cancelables
//! of each step of the fetch (authentication, the transport task, and any
//! re-authenticated retry), so the single handle the caller holds reaches
//! whatever is in flight.

use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use futures::future::AbortHandle;
use tracing::trace;

use crate::session::SessionTask;

// ============================================================================
// Cancelable Trait
// ============================================================================

/// Something in flight that can be cancelled.
///
/// `cancel` is idempotent.
pub trait Cancelable: Send + Sync {
    /// Cancels the work.
    fn cancel(&self);
}

impl Cancelable for AbortHandle {
    fn cancel(&self) {
        self.abort();
    }
}

// ============================================================================
// No-op
// ============================================================================

/// A cancelable that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCancelable;

impl Cancelable for NoopCancelable {
    fn cancel(&self) {}
}

// ============================================================================
// Single Task
// ============================================================================

/// Cancels a single transport task through a non-owning reference.
///
/// Once the session has released the task (because it completed), `cancel`
/// is a silent no-op.
pub struct TaskCancelable {
    task: Weak<dyn SessionTask>,
}

impl TaskCancelable {
    /// Creates a cancelable for the given task.
    pub fn new(task: Weak<dyn SessionTask>) -> Self {
        Self { task }
    }

    /// Returns true if the task is still alive.
    pub fn is_alive(&self) -> bool {
        self.task.strong_count() > 0
    }
}

impl Cancelable for TaskCancelable {
    fn cancel(&self) {
        match self.task.upgrade() {
            Some(task) => task.cancel(),
            None => trace!("Task already released, nothing to cancel"),
        }
    }
}

impl std::fmt::Debug for TaskCancelable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCancelable")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ============================================================================
// Bag
// ============================================================================

#[derive(Default)]
struct BagState {
    cancelled: bool,
    children: Vec<Box<dyn Cancelable>>,
}

/// An ordered collection of cancelables cancelled together.
///
/// Cancellation is sticky: a child added after the bag was cancelled is
/// cancelled immediately.
#[derive(Default)]
pub struct CancelableBag {
    state: Mutex<BagState>,
}

impl CancelableBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a child.
    pub fn add(&self, child: Box<dyn Cancelable>) {
        let mut state = self.lock();
        if state.cancelled {
            drop(state);
            trace!("Bag already cancelled, cancelling new child");
            child.cancel();
            return;
        }
        state.children.push(child);
    }

    /// Returns true once [`cancel`](Cancelable::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Returns the number of registered children.
    pub fn len(&self) -> usize {
        self.lock().children.len()
    }

    /// Returns true if no children are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cancelable for CancelableBag {
    fn cancel(&self) {
        // Children are cancelled outside the lock; a child may re-enter the bag.
        let children = {
            let mut state = self.lock();
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };

        trace!(children = children.len(), "Cancelling bag");
        for child in &children {
            child.cancel();
        }
    }
}

impl std::fmt::Debug for CancelableBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CancelableBag")
            .field("cancelled", &state.cancelled)
            .field("children", &state.children.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Cancelable for Recorder {
        fn cancel(&self) {
            self.log.lock().unwrap().push(self.id);
        }
    }

    struct CountingTask {
        cancels: AtomicUsize,
    }

    impl SessionTask for CountingTask {
        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_bag_cancels_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = CancelableBag::new();
        for id in 0..3 {
            bag.add(Box::new(Recorder {
                id,
                log: log.clone(),
            }));
        }

        bag.cancel();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert!(bag.is_cancelled());
    }

    #[test]
    fn test_bag_cancel_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = CancelableBag::new();
        bag.add(Box::new(Recorder {
            id: 1,
            log: log.clone(),
        }));

        bag.cancel();
        bag.cancel();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_bag_is_sticky() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = CancelableBag::new();
        bag.cancel();

        bag.add(Box::new(Recorder {
            id: 9,
            log: log.clone(),
        }));
        assert_eq!(*log.lock().unwrap(), vec![9]);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_task_cancelable_reaches_live_task() {
        let task = Arc::new(CountingTask {
            cancels: AtomicUsize::new(0),
        });
        let dyn_task: Arc<dyn SessionTask> = task.clone();
        let cancelable = TaskCancelable::new(Arc::downgrade(&dyn_task));

        cancelable.cancel();
        assert_eq!(task.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_cancelable_after_release_is_noop() {
        let task: Arc<dyn SessionTask> = Arc::new(CountingTask {
            cancels: AtomicUsize::new(0),
        });
        let cancelable = TaskCancelable::new(Arc::downgrade(&task));
        drop(task);

        assert!(!cancelable.is_alive());
        cancelable.cancel();
    }

    #[test]
    fn test_abort_handle() {
        let (handle, registration) = AbortHandle::new_pair();
        let _ = registration;
        Cancelable::cancel(&handle);
        assert!(handle.is_aborted());
    }
}
