//! Two-way bindable sub-state.

use std::fmt;
use std::sync::Arc;

use crate::store::StateStore;

/// An explicit getter/setter pair over one named field of a view model's
/// state, writable by the rendering layer without going through `process`.
///
/// Writes still publish a whole new snapshot, so every observer refreshes.
/// Screens expose a hand-written struct of these for exactly the fields a
/// form needs (a text field's value, a toggle) and nothing else.
pub struct Binding<S, T> {
    store: StateStore<S>,
    get: Arc<dyn Fn(&S) -> T + Send + Sync>,
    set: Arc<dyn Fn(&mut S, T) + Send + Sync>,
}

impl<S: Clone + Send + Sync + 'static, T> Binding<S, T> {
    /// Bind one field of the store's state.
    pub fn new(
        store: &StateStore<S>,
        get: impl Fn(&S) -> T + Send + Sync + 'static,
        set: impl Fn(&mut S, T) + Send + Sync + 'static,
    ) -> Self {
        Self { store: store.clone(), get: Arc::new(get), set: Arc::new(set) }
    }

    /// Read the field from the current snapshot.
    pub fn get(&self) -> T {
        self.store.read(|state| (self.get)(state))
    }

    /// Write the field, publishing a new snapshot.
    pub fn set(&self, value: T) {
        self.store.update(|state| (self.set)(state, value));
    }
}

impl<S, T> Clone for Binding<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<S, T> fmt::Debug for Binding<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Form {
        username: String,
        remember_me: bool,
    }

    #[test]
    fn writes_publish_new_snapshots() {
        let store = StateStore::new(Form { username: String::new(), remember_me: false });
        let username = Binding::new(
            &store,
            |form: &Form| form.username.clone(),
            |form, value| form.username = value,
        );
        let mut observer = store.subscribe();

        username.set("alice".into());

        assert_eq!(username.get(), "alice");
        assert!(observer.has_changed().unwrap());
        assert_eq!(observer.borrow_and_update().username, "alice");
        // The rest of the snapshot is untouched.
        assert!(!store.state().remember_me);
    }
}
