//! The secure backup setup screens' view model.
//!
//! One view model backs both steps of the flow: the intro (explain, then
//! create) and the recovery key display (save, confirm, acknowledge).

use confab_session::{ClientError, RecoveryKey};
use confab_store::{Binding, StateStore, ViewModel};

/// Everything the backup screens render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupScreenState {
    /// Backup creation is in flight; controls should be disabled.
    pub creating: bool,
    /// The generated recovery key, present once creation succeeded.
    pub recovery_key: Option<String>,
    /// The user confirmed they saved the key, two-way bound.
    pub saved_confirmed: bool,
    /// User-visible failure, cleared on the next attempt.
    pub alert: Option<String>,
}

/// Actions the rendering layer dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupScreenAction {
    /// Start creating the backup.
    Continue,
    /// The key is saved; finish the flow.
    Acknowledge,
    /// Abandon setup.
    Cancel,
}

/// Actions the view model emits to its coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupScreenViewModelAction {
    /// Create the backup.
    Continue,
    /// The user confirmed the key is saved.
    Acknowledged,
    /// The user abandoned setup.
    Cancelled,
}

/// The fields the rendering layer writes directly.
#[derive(Debug, Clone)]
pub struct BackupScreenBindings {
    /// "I have saved my recovery key" checkbox.
    pub saved_confirmed: Binding<BackupScreenState, bool>,
}

/// View model behind both backup setup screens.
pub struct BackupScreenViewModel {
    store: StateStore<BackupScreenState>,
    bindings: BackupScreenBindings,
    actions: Box<dyn FnMut(BackupScreenViewModelAction) + Send>,
}

impl BackupScreenViewModel {
    /// Create the view model; `actions` receives what the user asks for.
    pub fn new(actions: impl FnMut(BackupScreenViewModelAction) + Send + 'static) -> Self {
        let store = StateStore::new(BackupScreenState::default());
        let bindings = BackupScreenBindings {
            saved_confirmed: Binding::new(
                &store,
                |state: &BackupScreenState| state.saved_confirmed,
                |state, value| state.saved_confirmed = value,
            ),
        };
        Self { store, bindings, actions: Box::new(actions) }
    }

    /// The coordinator reports the generated key; show it.
    pub fn show_recovery_key(&mut self, key: &RecoveryKey) {
        let revealed = key.reveal().to_owned();
        self.store.update(|state| {
            state.creating = false;
            state.recovery_key = Some(revealed);
        });
    }

    /// The coordinator reports a failed creation; surface it and re-enable
    /// the intro step.
    pub fn backup_failed(&mut self, error: &ClientError) {
        let message = match error {
            ClientError::BackupExists => "Key backup is already enabled for this account.",
            ClientError::Network(_) => "Couldn't reach the server. Try again.",
            _ => "Backup could not be created. Try again.",
        };
        self.store.update(|state| {
            state.creating = false;
            state.alert = Some(message.to_owned());
        });
    }
}

impl ViewModel for BackupScreenViewModel {
    type State = BackupScreenState;
    type Action = BackupScreenAction;
    type Bindings = BackupScreenBindings;

    fn store(&self) -> &StateStore<BackupScreenState> {
        &self.store
    }

    fn bindings(&self) -> BackupScreenBindings {
        self.bindings.clone()
    }

    fn process(&mut self, action: BackupScreenAction) {
        match action {
            BackupScreenAction::Continue => {
                if self.store.read(|state| state.creating) {
                    tracing::debug!("backup creation already in flight, ignoring");
                    return;
                }
                self.store.update(|state| {
                    state.creating = true;
                    state.alert = None;
                });
                (self.actions)(BackupScreenViewModelAction::Continue);
            },
            BackupScreenAction::Acknowledge => {
                if !self.store.read(|state| state.saved_confirmed) {
                    self.store.update(|state| {
                        state.alert =
                            Some("Confirm you have saved your recovery key first.".to_owned());
                    });
                    return;
                }
                (self.actions)(BackupScreenViewModelAction::Acknowledged);
            },
            BackupScreenAction::Cancel => {
                (self.actions)(BackupScreenViewModelAction::Cancelled);
            },
        }
    }
}
