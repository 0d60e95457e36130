//! The login form's view model.

use confab_session::{ClientError, Credentials};
use confab_store::{Binding, StateStore, ViewModel};

/// Everything the login screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginScreenState {
    /// Typed username, two-way bound.
    pub username: String,
    /// Typed password, two-way bound.
    pub password: String,
    /// A login attempt is in flight; controls should be disabled.
    pub submitting: bool,
    /// User-visible failure, cleared on the next attempt.
    pub alert: Option<String>,
}

/// Actions the rendering layer dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginScreenAction {
    /// The user tapped the login button.
    Submit,
    /// The user dismissed the alert.
    ClearAlert,
}

/// Actions the view model emits to its coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginScreenViewModelAction {
    /// The user asked to log in with these credentials.
    Login(Credentials),
}

/// The form fields the rendering layer writes directly.
#[derive(Debug, Clone)]
pub struct LoginScreenBindings {
    /// Username text field.
    pub username: Binding<LoginScreenState, String>,
    /// Password text field.
    pub password: Binding<LoginScreenState, String>,
}

/// View model behind the login form.
pub struct LoginScreenViewModel {
    store: StateStore<LoginScreenState>,
    bindings: LoginScreenBindings,
    actions: Box<dyn FnMut(LoginScreenViewModelAction) + Send>,
}

impl LoginScreenViewModel {
    /// Create the view model; `actions` receives what the user asks for.
    pub fn new(actions: impl FnMut(LoginScreenViewModelAction) + Send + 'static) -> Self {
        let store = StateStore::new(LoginScreenState::default());
        let bindings = LoginScreenBindings {
            username: Binding::new(
                &store,
                |state: &LoginScreenState| state.username.clone(),
                |state, value| state.username = value,
            ),
            password: Binding::new(
                &store,
                |state: &LoginScreenState| state.password.clone(),
                |state, value| state.password = value,
            ),
        };
        Self { store, bindings, actions: Box::new(actions) }
    }

    /// The coordinator reports a failed attempt; surface it and re-enable
    /// the form. The screen stays mounted — retry is the user's call.
    pub fn login_failed(&mut self, error: &ClientError) {
        let message = describe_error(error);
        self.store.update(|state| {
            state.submitting = false;
            state.alert = Some(message);
        });
    }

    /// The coordinator rejected a submission with missing fields.
    pub fn incomplete_credentials(&mut self) {
        self.store.update(|state| {
            state.submitting = false;
            state.alert = Some("Enter a username and password.".to_owned());
        });
    }
}

fn describe_error(error: &ClientError) -> String {
    match error {
        ClientError::InvalidCredentials => "Incorrect username or password.".to_owned(),
        ClientError::AccountDeactivated => "This account has been deactivated.".to_owned(),
        ClientError::Network(_) => {
            "Couldn't reach the server. Check your connection and try again.".to_owned()
        },
        _ => "Something went wrong. Please try again.".to_owned(),
    }
}

impl ViewModel for LoginScreenViewModel {
    type State = LoginScreenState;
    type Action = LoginScreenAction;
    type Bindings = LoginScreenBindings;

    fn store(&self) -> &StateStore<LoginScreenState> {
        &self.store
    }

    fn bindings(&self) -> LoginScreenBindings {
        self.bindings.clone()
    }

    fn process(&mut self, action: LoginScreenAction) {
        match action {
            LoginScreenAction::Submit => {
                let state = self.store.state();
                if state.submitting {
                    tracing::debug!("submit while already submitting, ignoring");
                    return;
                }
                self.store.update(|state| {
                    state.submitting = true;
                    state.alert = None;
                });
                let credentials =
                    Credentials { username: state.username, password: state.password };
                (self.actions)(LoginScreenViewModelAction::Login(credentials));
            },
            LoginScreenAction::ClearAlert => {
                self.store.update(|state| state.alert = None);
            },
        }
    }
}
