//! State-store/view-model binding for Confab screens.
//!
//! Decouples *what changed* (an observable state snapshot) from *who may
//! trigger a change* (a single action-dispatch entry point). The rendering
//! layer holds a [`Context`]: a read/observe capability over the view model's
//! state plus `send(action)`. All mutation funnels through
//! [`ViewModel::process`], except for fields a screen explicitly exposes as
//! two-way [`Binding`]s.
//!
//! # Ownership
//!
//! A coordinator owns its view model through a [`ViewModelHandle`]; contexts
//! hold only a weak back-reference. When the coordinator discards the handle,
//! every outstanding context goes inert: `send` becomes a logged no-op and
//! the last published snapshot remains readable. Passive subscriptions a view
//! model makes to upstream publishers are registered in a
//! [`SubscriptionSet`] whose lifetime equals the view model's, so teardown
//! releases them all.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod binding;
mod context;
mod store;
mod subscriptions;
mod view_model;

pub use binding::Binding;
pub use context::Context;
pub use store::StateStore;
pub use subscriptions::SubscriptionSet;
pub use view_model::{ViewModel, ViewModelHandle, WeakViewModel};
