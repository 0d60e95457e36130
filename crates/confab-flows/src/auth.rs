//! The authentication flow.
//!
//! Owns the login screen and drives the SDK login call. Success tears the
//! screen down and reports the session to the parent; failure surfaces an
//! alert on the login view model and leaves the screen mounted so the user
//! decides whether to retry.

use std::collections::VecDeque;
use std::sync::Arc;

use confab_machine::{
    HandlerPattern, Machine, MachineBuilder, MachineEvent, MachineState, Rejected, Route,
    Transition,
};
use confab_session::{ChatClient, ClientError, Credentials, SessionInfo};
use confab_store::{SubscriptionSet, ViewModelHandle};

use crate::coordinator::Coordinator;
use crate::message::EventSink;
use crate::navigation::{Navigator, Screen, with_nav};
use crate::screens::login_screen::{LoginScreenViewModel, LoginScreenViewModelAction};

/// States of the authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// Showing the login form.
    LoggedOut,
    /// A login attempt is in flight.
    Authenticating,
    /// A session is established; the flow is done.
    LoggedIn,
}

impl MachineState for AuthState {
    type Kind = Self;

    fn kind(&self) -> Self {
        *self
    }
}

/// Events driving the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The user submitted the login form.
    CredentialsSubmitted(Credentials),
    /// The SDK established a session.
    AuthSucceeded(SessionInfo),
    /// The SDK rejected the attempt.
    AuthFailed(ClientError),
}

/// Discriminants of [`AuthEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    /// [`AuthEvent::CredentialsSubmitted`].
    CredentialsSubmitted,
    /// [`AuthEvent::AuthSucceeded`].
    AuthSucceeded,
    /// [`AuthEvent::AuthFailed`].
    AuthFailed,
}

impl MachineEvent for AuthEvent {
    type Kind = AuthEventKind;

    fn kind(&self) -> AuthEventKind {
        match self {
            Self::CredentialsSubmitted(_) => AuthEventKind::CredentialsSubmitted,
            Self::AuthSucceeded(_) => AuthEventKind::AuthSucceeded,
            Self::AuthFailed(_) => AuthEventKind::AuthFailed,
        }
    }
}

/// How the flow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The user signed in.
    SignedIn(SessionInfo),
}

type CompletionCallback = Box<dyn FnOnce(AuthOutcome) + Send>;

#[allow(clippy::expect_used, reason = "static route table, validated by the tests below")]
fn build_machine() -> Machine<AuthState, AuthEvent> {
    MachineBuilder::new(AuthState::LoggedOut)
        .route(
            Route::new(
                AuthState::LoggedOut,
                AuthEventKind::CredentialsSubmitted,
                AuthState::Authenticating,
            )
            .when(|_, event| {
                matches!(event, AuthEvent::CredentialsSubmitted(c) if c.is_complete())
            }),
        )
        .route(Route::new(AuthState::Authenticating, AuthEventKind::AuthSucceeded, AuthState::LoggedIn))
        .route(Route::new(AuthState::Authenticating, AuthEventKind::AuthFailed, AuthState::LoggedOut))
        .build()
        .expect("authentication route table is unambiguous")
}

/// Coordinator for the authentication flow.
pub struct AuthenticationFlowCoordinator {
    machine: Machine<AuthState, AuthEvent>,
    client: Arc<dyn ChatClient>,
    navigator: Navigator,
    sink: EventSink,
    on_complete: Option<CompletionCallback>,
    login: Option<ViewModelHandle<LoginScreenViewModel>>,
    tasks: SubscriptionSet,
    pending: VecDeque<AuthEvent>,
    draining: bool,
    started: bool,
}

impl AuthenticationFlowCoordinator {
    /// Create the flow. `on_complete` fires at most once, with the session.
    pub fn new(
        client: Arc<dyn ChatClient>,
        navigator: Navigator,
        sink: EventSink,
        on_complete: impl FnOnce(AuthOutcome) + Send + 'static,
    ) -> Self {
        let mut machine = build_machine();
        machine.on_transition(HandlerPattern::any(), |commit, _| {
            tracing::info!(from = ?commit.from, to = ?commit.to, "authentication transition");
        });

        Self {
            machine,
            client,
            navigator,
            sink,
            on_complete: Some(Box::new(on_complete)),
            login: None,
            tasks: SubscriptionSet::new(),
            pending: VecDeque::new(),
            draining: false,
            started: false,
        }
    }

    /// Current flow state.
    pub fn state(&self) -> AuthState {
        *self.machine.state()
    }

    /// Feed one event, then drain everything it cascades into, strictly one
    /// event at a time.
    pub fn process_event(&mut self, event: AuthEvent) {
        self.pending.push_back(event);
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(next) = self.pending.pop_front() {
            match self.machine.try_event(next) {
                Ok(transition) => {
                    self.on_transition(&transition);
                    self.pending.extend(transition.followups);
                },
                Err(rejected) => self.on_rejected(&rejected),
            }
        }
        self.draining = false;
    }

    fn on_transition(&mut self, transition: &Transition<AuthState, AuthEvent>) {
        match (transition.to, &transition.event) {
            (AuthState::Authenticating, AuthEvent::CredentialsSubmitted(credentials)) => {
                self.attempt_login(credentials.clone());
            },
            (AuthState::LoggedIn, AuthEvent::AuthSucceeded(session)) => {
                // The screen unmounts with its view model; the parent decides
                // what replaces it.
                self.login = None;
                let session = session.clone();
                self.complete(AuthOutcome::SignedIn(session));
            },
            (AuthState::LoggedOut, AuthEvent::AuthFailed(error)) => {
                if let Some(login) = &self.login {
                    login.with(|vm| vm.login_failed(error));
                }
            },
            _ => {},
        }
    }

    fn on_rejected(&mut self, rejected: &Rejected<AuthState, AuthEvent>) {
        match &rejected.event {
            AuthEvent::CredentialsSubmitted(_) if rejected.state == AuthState::LoggedOut => {
                // The guard refused the submission: a field is empty.
                if let Some(login) = &self.login {
                    login.with(LoginScreenViewModel::incomplete_credentials);
                }
            },
            event => {
                tracing::warn!(state = ?rejected.state, event = ?event, "unhandled authentication event");
            },
        }
    }

    fn attempt_login(&mut self, credentials: Credentials) {
        let client = Arc::clone(&self.client);
        let sink = self.sink.clone();
        self.tasks.spawn(async move {
            match client.login(credentials).await {
                Ok(session) => sink.send(AuthEvent::AuthSucceeded(session)),
                Err(error) => sink.send(AuthEvent::AuthFailed(error)),
            }
        });
    }

    fn complete(&mut self, outcome: AuthOutcome) {
        if let Some(callback) = self.on_complete.take() {
            callback(outcome);
        }
    }
}

impl Coordinator for AuthenticationFlowCoordinator {
    fn start(&mut self) {
        debug_assert!(!self.started, "authentication flow started twice");
        self.started = true;

        let sink = self.sink.clone();
        let login = ViewModelHandle::new(LoginScreenViewModel::new(move |action| {
            let LoginScreenViewModelAction::Login(credentials) = action;
            sink.send(AuthEvent::CredentialsSubmitted(credentials));
        }));
        with_nav(&self.navigator, |nav| nav.set_root(Screen::Login(login.context())));
        self.login = Some(login);
    }

    fn stop(&mut self) {
        self.on_complete = None;
        self.tasks.cancel_all();
        self.login = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use confab_session::{RecoveryKey, RoomSummary};
    use tokio::sync::watch;

    use super::*;
    use crate::navigation::{NoopPresenter, navigator};

    /// Client whose login never resolves; for tests that only care about
    /// synchronous coordinator behavior.
    struct NullClient;

    #[async_trait]
    impl ChatClient for NullClient {
        fn has_session(&self) -> bool {
            false
        }

        async fn login(&self, _credentials: Credentials) -> Result<SessionInfo, ClientError> {
            std::future::pending().await
        }

        async fn restore_session(&self) -> Result<SessionInfo, ClientError> {
            Err(ClientError::NoSessionToRestore)
        }

        async fn sign_out(&self) -> Result<(), ClientError> {
            Ok(())
        }

        async fn enable_backup(&self) -> Result<RecoveryKey, ClientError> {
            Err(ClientError::Sdk("not scripted".into()))
        }

        fn room_summaries(&self) -> Vec<RoomSummary> {
            Vec::new()
        }

        fn subscribe_rooms(&self) -> watch::Receiver<Vec<RoomSummary>> {
            watch::Sender::new(Vec::new()).subscribe()
        }
    }

    fn creds(username: &str, password: &str) -> AuthEvent {
        AuthEvent::CredentialsSubmitted(Credentials {
            username: username.into(),
            password: password.into(),
        })
    }

    fn session() -> SessionInfo {
        SessionInfo { user_id: "@alice:example.org".into(), device_id: "DEVICE".into() }
    }

    #[test]
    fn submission_guard_requires_complete_credentials() {
        let mut machine = build_machine();

        let rejected = machine.try_event(creds("alice", "")).unwrap_err();
        assert_eq!(rejected.state, AuthState::LoggedOut);

        machine.try_event(creds("alice", "secret")).unwrap();
        assert_eq!(*machine.state(), AuthState::Authenticating);
    }

    #[test]
    fn failure_returns_to_logged_out() {
        let mut machine = build_machine();
        machine.try_event(creds("alice", "secret")).unwrap();

        machine.try_event(AuthEvent::AuthFailed(ClientError::InvalidCredentials)).unwrap();

        assert_eq!(*machine.state(), AuthState::LoggedOut);
    }

    #[test]
    fn success_is_terminal() {
        let mut machine = build_machine();
        machine.try_event(creds("alice", "secret")).unwrap();
        machine.try_event(AuthEvent::AuthSucceeded(session())).unwrap();

        // Nothing routes out of LoggedIn; stray results are rejections.
        let rejected = machine.try_event(AuthEvent::AuthFailed(ClientError::InvalidCredentials));
        assert!(rejected.is_err());
        assert_eq!(*machine.state(), AuthState::LoggedIn);
    }

    #[test]
    fn results_only_apply_while_authenticating() {
        let mut machine = build_machine();

        let rejected = machine.try_event(AuthEvent::AuthSucceeded(session()));

        assert!(rejected.is_err());
        assert_eq!(*machine.state(), AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn followup_events_drain_only_after_the_commit_completes() {
        let (sink, _messages) = EventSink::channel();
        let mut flow = AuthenticationFlowCoordinator::new(
            Arc::new(NullClient),
            navigator(Box::new(NoopPresenter)),
            sink,
            |_| {},
        );

        let order = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&order);
        flow.machine.on_transition(HandlerPattern::any(), move |commit, _| {
            log.lock().unwrap().push((*commit.from, *commit.to));
        });
        // Entering Authenticating immediately requests a failure. The event
        // is queued, and must commit only after this transition's handlers
        // have all returned.
        flow.machine.on_transition(
            HandlerPattern::any().to_state(AuthState::Authenticating),
            |_, queue| queue.push(AuthEvent::AuthFailed(ClientError::Sdk("injected".into()))),
        );

        flow.start();
        flow.process_event(creds("alice", "secret"));

        assert_eq!(flow.state(), AuthState::LoggedOut);
        assert_eq!(
            *order.lock().unwrap(),
            vec![
                (AuthState::LoggedOut, AuthState::Authenticating),
                (AuthState::Authenticating, AuthState::LoggedOut),
            ]
        );
    }
}
