//! The settings screen's view model.

use std::sync::Arc;

use confab_session::{AppSettings, SettingsStore};
use confab_store::{Binding, StateStore, SubscriptionSet, ViewModel};

/// Everything the settings screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsScreenState {
    /// The current settings values.
    pub settings: AppSettings,
}

/// Actions the rendering layer dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScreenAction {
    /// The user is done with settings.
    Done,
    /// The user asked to sign out.
    SignOut,
}

/// Actions the view model emits to its coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScreenViewModelAction {
    /// Dismiss the settings screen.
    Done,
    /// Sign the user out.
    SignOut,
}

/// The toggles the rendering layer writes directly.
///
/// Each write lands in the screen snapshot and the persisted store in one
/// step; there is no separate "save" action.
#[derive(Debug, Clone)]
pub struct SettingsScreenBindings {
    /// Push notification toggle.
    pub notifications_enabled: Binding<SettingsScreenState, bool>,
    /// Analytics reporting toggle.
    pub analytics_enabled: Binding<SettingsScreenState, bool>,
    /// Developer diagnostics toggle.
    pub developer_mode: Binding<SettingsScreenState, bool>,
}

/// View model behind the settings screen.
///
/// Observes the settings store for its whole lifetime, so changes made
/// elsewhere in the process show up without a round-trip through this
/// screen.
pub struct SettingsScreenViewModel {
    store: StateStore<SettingsScreenState>,
    bindings: SettingsScreenBindings,
    actions: Box<dyn FnMut(SettingsScreenViewModelAction) + Send>,
    subscriptions: SubscriptionSet,
}

impl SettingsScreenViewModel {
    /// Create the view model, seeded from the persisted settings.
    pub fn new(
        settings_store: &Arc<dyn SettingsStore>,
        actions: impl FnMut(SettingsScreenViewModelAction) + Send + 'static,
    ) -> Self {
        let store = StateStore::new(SettingsScreenState { settings: settings_store.settings() });
        let bindings = SettingsScreenBindings {
            notifications_enabled: write_through(
                &store,
                settings_store,
                |s| s.notifications_enabled,
                |s, v| s.notifications_enabled = v,
            ),
            analytics_enabled: write_through(
                &store,
                settings_store,
                |s| s.analytics_enabled,
                |s, v| s.analytics_enabled = v,
            ),
            developer_mode: write_through(
                &store,
                settings_store,
                |s| s.developer_mode,
                |s, v| s.developer_mode = v,
            ),
        };

        let mut subscriptions = SubscriptionSet::new();
        let mut updates = settings_store.subscribe();
        let observer = store.clone();
        subscriptions.spawn(async move {
            while updates.changed().await.is_ok() {
                let settings = updates.borrow_and_update().clone();
                observer.update(|state| state.settings = settings);
            }
        });

        Self { store, bindings, actions: Box::new(actions), subscriptions }
    }

    /// Number of upstream subscriptions this view model holds.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// A toggle binding that updates the screen snapshot and persists the whole
/// settings value in the same write.
fn write_through(
    store: &StateStore<SettingsScreenState>,
    settings_store: &Arc<dyn SettingsStore>,
    get: impl Fn(&AppSettings) -> bool + Send + Sync + 'static,
    set: impl Fn(&mut AppSettings, bool) + Send + Sync + 'static,
) -> Binding<SettingsScreenState, bool> {
    let persist = Arc::clone(settings_store);
    Binding::new(
        store,
        move |state: &SettingsScreenState| get(&state.settings),
        move |state, value| {
            set(&mut state.settings, value);
            persist.replace(state.settings.clone());
        },
    )
}

impl ViewModel for SettingsScreenViewModel {
    type State = SettingsScreenState;
    type Action = SettingsScreenAction;
    type Bindings = SettingsScreenBindings;

    fn store(&self) -> &StateStore<SettingsScreenState> {
        &self.store
    }

    fn bindings(&self) -> SettingsScreenBindings {
        self.bindings.clone()
    }

    fn process(&mut self, action: SettingsScreenAction) {
        match action {
            SettingsScreenAction::Done => {
                (self.actions)(SettingsScreenViewModelAction::Done);
            },
            SettingsScreenAction::SignOut => {
                (self.actions)(SettingsScreenViewModelAction::SignOut);
            },
        }
    }
}
