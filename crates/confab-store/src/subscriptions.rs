//! Abort-on-drop container for a view model's passive subscriptions.

use tokio::task::AbortHandle;

/// Holds the abort handles of every task a view model spawned: upstream
/// subscriptions (settings changes, session events) and in-flight async
/// operations.
///
/// Dropping the set aborts them all. A view model that spawns outside its
/// set leaks the subscription past its own lifetime — this container is the
/// invariant, not a convenience.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    handles: Vec<AbortHandle>,
}

impl SubscriptionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task whose lifetime is bounded by this set.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(future).abort_handle());
    }

    /// Track an externally spawned task.
    pub fn insert(&mut self, handle: AbortHandle) {
        self.handles.push(handle);
    }

    /// Abort everything now, without waiting for drop.
    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Number of tracked tasks, finished or not.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set tracks no tasks.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
