//! Canonical state snapshot behind a watch channel.

use std::sync::Arc;

use tokio::sync::watch;

/// Owns a view model's canonical state snapshot.
///
/// Every mutation publishes a new value to all live observers before the
/// next action can be processed; observers never see a stale snapshot within
/// a logical turn. The rendering layer never holds a store directly, only
/// the receivers minted from it.
#[derive(Debug)]
pub struct StateStore<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self { tx: Arc::clone(&self.tx) }
    }
}

impl<S: Clone + Send + Sync + 'static> StateStore<S> {
    /// Create a store holding the initial snapshot.
    pub fn new(initial: S) -> Self {
        Self { tx: Arc::new(watch::Sender::new(initial)) }
    }

    /// Clone of the current snapshot.
    pub fn state(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Read a value out of the current snapshot without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mutate the snapshot in place and notify every observer.
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    /// Replace the snapshot wholesale and notify every observer.
    pub fn replace(&self, state: S) {
        self.tx.send_replace(state);
    }

    /// A receiver observing every subsequent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}
