//! The rendering-layer façade: snapshot observation plus action dispatch.

use std::fmt;
use std::sync::{Mutex, PoisonError, Weak};

use tokio::sync::watch;

use crate::view_model::ViewModel;

/// What a screen hands to the rendering layer: the current state snapshot,
/// the screen's bindable sub-state, and `send(action)`.
///
/// Holds only a weak back-reference to its view model. Once the owning
/// [`ViewModelHandle`](crate::ViewModelHandle) is dropped, `send` becomes a
/// no-op and `state` keeps returning the last published snapshot; a stale
/// context is never a crash.
pub struct Context<VM: ViewModel> {
    state: watch::Receiver<VM::State>,
    bindings: VM::Bindings,
    vm: Weak<Mutex<VM>>,
}

impl<VM: ViewModel> Context<VM> {
    pub(crate) fn new(
        state: watch::Receiver<VM::State>,
        bindings: VM::Bindings,
        vm: Weak<Mutex<VM>>,
    ) -> Self {
        Self { state, bindings, vm }
    }

    /// Clone of the current snapshot. Immutable between turns; the rendering
    /// layer must not assume in-place mutation is visible to anyone.
    pub fn state(&self) -> VM::State {
        self.state.borrow().clone()
    }

    /// The screen's explicitly bindable sub-state.
    pub fn bindings(&self) -> &VM::Bindings {
        &self.bindings
    }

    /// A receiver the rendering layer can await snapshot changes on.
    pub fn observe(&self) -> watch::Receiver<VM::State> {
        self.state.clone()
    }

    /// Dispatch an action to the owning view model.
    ///
    /// Processed synchronously. Dropped with a debug log when the view model
    /// no longer exists.
    pub fn send(&self, action: VM::Action) {
        match self.vm.upgrade() {
            Some(vm) => {
                let mut guard = vm.lock().unwrap_or_else(PoisonError::into_inner);
                guard.process(action);
            },
            None => {
                tracing::debug!("action sent to a released view model, dropping");
            },
        }
    }

    /// Whether the owning view model is still alive.
    pub fn is_live(&self) -> bool {
        self.vm.strong_count() > 0
    }
}

impl<VM: ViewModel> Clone for Context<VM> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            bindings: self.bindings.clone(),
            vm: Weak::clone(&self.vm),
        }
    }
}

impl<VM: ViewModel> fmt::Debug for Context<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("live", &self.is_live()).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::StateStore;
    use crate::view_model::ViewModelHandle;

    struct Echo {
        store: StateStore<String>,
    }

    impl ViewModel for Echo {
        type State = String;
        type Action = String;
        type Bindings = ();

        fn store(&self) -> &StateStore<String> {
            &self.store
        }

        fn bindings(&self) {}

        fn process(&mut self, action: String) {
            self.store.replace(action);
        }
    }

    fn echo_handle() -> ViewModelHandle<Echo> {
        ViewModelHandle::new(Echo { store: StateStore::new(String::new()) })
    }

    #[test]
    fn send_updates_observable_state() {
        let handle = echo_handle();
        let context = handle.context();

        context.send("hello".into());

        assert_eq!(context.state(), "hello");
    }

    #[test]
    fn stale_context_send_is_a_noop() {
        let handle = echo_handle();
        let context = handle.context();
        context.send("before".into());

        drop(handle);

        assert!(!context.is_live());
        context.send("after".into());
        // The last snapshot survives; the dropped action changed nothing.
        assert_eq!(context.state(), "before");
    }

    #[test]
    fn contexts_clone_and_share_the_snapshot() {
        let handle = echo_handle();
        let context = handle.context();
        let sibling = context.clone();

        context.send("shared".into());

        assert_eq!(sibling.state(), "shared");
    }
}
