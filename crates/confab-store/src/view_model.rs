//! The view-model contract and its owning handle.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::context::Context;
use crate::store::StateStore;

/// A screen's view model: private mutable state, published as snapshots, and
/// a single action-processing entry point.
pub trait ViewModel: Send + 'static {
    /// Everything the rendering layer needs to draw this screen.
    type State: Clone + Send + Sync + 'static;

    /// Actions the rendering layer may dispatch through a [`Context`].
    type Action: Send + 'static;

    /// The screen's explicitly bindable sub-state: a hand-written struct of
    /// [`Binding`](crate::Binding)s, or `()` when nothing is two-way bound.
    type Bindings: Clone + Send + Sync + 'static;

    /// The store holding this view model's canonical state.
    fn store(&self) -> &StateStore<Self::State>;

    /// The bindable sub-state handed to contexts at mint time.
    fn bindings(&self) -> Self::Bindings;

    /// Process one action. Called synchronously from [`Context::send`]; must
    /// not block. Long-running work is spawned and its completion marshalled
    /// back through the owning flow's event channel.
    fn process(&mut self, action: Self::Action);
}

/// Owning handle to a view model.
///
/// Coordinators hold exactly one handle per screen they present; dropping it
/// destroys the view model, aborts its subscriptions, and turns every
/// outstanding [`Context`] inert.
#[derive(Debug)]
pub struct ViewModelHandle<VM> {
    inner: Arc<Mutex<VM>>,
}

impl<VM: ViewModel> ViewModelHandle<VM> {
    /// Take ownership of a view model.
    pub fn new(view_model: VM) -> Self {
        Self { inner: Arc::new(Mutex::new(view_model)) }
    }

    /// Run a closure against the view model.
    pub fn with<R>(&self, f: impl FnOnce(&mut VM) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Dispatch an action, exactly as a context would.
    pub fn send(&self, action: VM::Action) {
        self.with(|vm| vm.process(action));
    }

    /// Mint a rendering-layer façade for this view model.
    pub fn context(&self) -> Context<VM> {
        let (state, bindings) = self.with(|vm| (vm.store().subscribe(), vm.bindings()));
        Context::new(state, bindings, Arc::downgrade(&self.inner))
    }

    /// A non-owning handle for async completions. Upgrading fails once the
    /// owning handle is gone, so late results are discarded rather than
    /// applied to a dead screen.
    pub fn downgrade(&self) -> WeakViewModel<VM> {
        WeakViewModel { inner: Arc::downgrade(&self.inner) }
    }
}

/// Non-owning view-model reference held by spawned tasks.
#[derive(Debug)]
pub struct WeakViewModel<VM> {
    inner: Weak<Mutex<VM>>,
}

impl<VM> Clone for WeakViewModel<VM> {
    fn clone(&self) -> Self {
        Self { inner: Weak::clone(&self.inner) }
    }
}

impl<VM: ViewModel> WeakViewModel<VM> {
    /// Run a closure against the view model if it is still alive.
    ///
    /// Returns `None` (and does nothing) once the owning handle has been
    /// dropped.
    pub fn with<R>(&self, f: impl FnOnce(&mut VM) -> R) -> Option<R> {
        let arc = self.inner.upgrade()?;
        let mut guard = arc.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }
}
