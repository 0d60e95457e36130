//! The top-level app flow and composition root.
//!
//! [`AppCoordinator`] receives every external collaborator at construction,
//! owns the top-level machine, and is the single dispatcher for the flow
//! channel: each [`FlowMessage`] goes to the flow that owns it, and messages
//! for a flow that has been torn down are dropped with a debug log.

use std::collections::VecDeque;
use std::sync::Arc;

use confab_machine::{
    HandlerPattern, Machine, MachineBuilder, MachineEvent, MachineState, Rejected, Route,
    Transition,
};
use confab_session::{ChatClient, ClientError, RoomId, SessionInfo, SettingsStore};
use confab_store::SubscriptionSet;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::auth::{AuthOutcome, AuthenticationFlowCoordinator};
use crate::coordinator::Coordinator;
use crate::message::{EventSink, FlowMessage};
use crate::navigation::{Navigator, Presenter, navigator};
use crate::session::{SessionEvent, SessionFlowOutcome, UserSessionFlowCoordinator};

/// States of the top-level app flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Before `start`.
    Initial,
    /// Showing the authentication flow.
    SignedOut,
    /// Reopening the session persisted on this device.
    RestoringSession,
    /// The user session flow is active.
    SignedIn,
    /// A sign-out request is in flight.
    SigningOut,
}

impl MachineState for AppState {
    type Kind = Self;

    fn kind(&self) -> Self {
        *self
    }
}

/// Events driving the top-level app flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Start by showing authentication.
    StartWithAuthentication,
    /// Start by restoring the persisted session.
    StartWithExistingSession,
    /// A session exists, freshly created or restored.
    SessionCreated(SessionInfo),
    /// Restoring the persisted session failed.
    RestoreFailed(ClientError),
    /// The user asked to sign out.
    SignOutRequested,
    /// The SDK finished signing out.
    CompletedSignOut,
}

/// Discriminants of [`AppEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppEventKind {
    /// [`AppEvent::StartWithAuthentication`].
    StartWithAuthentication,
    /// [`AppEvent::StartWithExistingSession`].
    StartWithExistingSession,
    /// [`AppEvent::SessionCreated`].
    SessionCreated,
    /// [`AppEvent::RestoreFailed`].
    RestoreFailed,
    /// [`AppEvent::SignOutRequested`].
    SignOutRequested,
    /// [`AppEvent::CompletedSignOut`].
    CompletedSignOut,
}

impl MachineEvent for AppEvent {
    type Kind = AppEventKind;

    fn kind(&self) -> AppEventKind {
        match self {
            Self::StartWithAuthentication => AppEventKind::StartWithAuthentication,
            Self::StartWithExistingSession => AppEventKind::StartWithExistingSession,
            Self::SessionCreated(_) => AppEventKind::SessionCreated,
            Self::RestoreFailed(_) => AppEventKind::RestoreFailed,
            Self::SignOutRequested => AppEventKind::SignOutRequested,
            Self::CompletedSignOut => AppEventKind::CompletedSignOut,
        }
    }
}

/// An externally activated destination — a notification tap, a URL.
///
/// Routes translate into the same [`SessionEvent`]s organic taps produce;
/// there is no second navigation path for deep links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppRoute {
    /// Open a room's timeline.
    Room(RoomId),
    /// Open the settings screen.
    Settings,
    /// Start secure backup setup.
    SecureBackup,
}

#[allow(clippy::expect_used, reason = "static route table, validated by the tests below")]
fn build_machine() -> Machine<AppState, AppEvent> {
    MachineBuilder::new(AppState::Initial)
        .route(Route::new(AppState::Initial, AppEventKind::StartWithAuthentication, AppState::SignedOut))
        .route(Route::new(AppState::Initial, AppEventKind::StartWithExistingSession, AppState::RestoringSession))
        .route(Route::new(AppState::RestoringSession, AppEventKind::SessionCreated, AppState::SignedIn))
        .route(Route::new(AppState::RestoringSession, AppEventKind::RestoreFailed, AppState::SignedOut))
        .route(Route::new(AppState::SignedOut, AppEventKind::SessionCreated, AppState::SignedIn))
        .route(Route::new(AppState::SignedIn, AppEventKind::SignOutRequested, AppState::SigningOut))
        .route(Route::new(AppState::SigningOut, AppEventKind::CompletedSignOut, AppState::SignedOut))
        .build()
        .expect("app route table is unambiguous")
}

/// The composition root: owns the top-level machine, the child flows, and
/// the flow channel dispatch.
pub struct AppCoordinator {
    machine: Machine<AppState, AppEvent>,
    client: Arc<dyn ChatClient>,
    settings: Arc<dyn SettingsStore>,
    navigator: Navigator,
    sink: EventSink,
    auth_flow: Option<AuthenticationFlowCoordinator>,
    session_flow: Option<UserSessionFlowCoordinator>,
    tasks: SubscriptionSet,
    pending: VecDeque<AppEvent>,
    draining: bool,
    started: bool,
}

impl AppCoordinator {
    /// Assemble the coordinator graph. Returns the coordinator and the
    /// receiver to drain — hand it to [`run`](Self::run), or pump it by hand
    /// in tests.
    pub fn new(
        client: Arc<dyn ChatClient>,
        settings: Arc<dyn SettingsStore>,
        presenter: Box<dyn Presenter>,
    ) -> (Self, UnboundedReceiver<FlowMessage>) {
        let (sink, messages) = EventSink::channel();
        let mut machine = build_machine();
        machine.on_transition(HandlerPattern::any(), |commit, _| {
            tracing::info!(from = ?commit.from, to = ?commit.to, "app transition");
        });

        let coordinator = Self {
            machine,
            client,
            settings,
            navigator: navigator(presenter),
            sink,
            auth_flow: None,
            session_flow: None,
            tasks: SubscriptionSet::new(),
            pending: VecDeque::new(),
            draining: false,
            started: false,
        };
        (coordinator, messages)
    }

    /// Current top-level state.
    pub fn state(&self) -> AppState {
        *self.machine.state()
    }

    /// The shared navigation stack, for the rendering layer.
    pub fn navigator(&self) -> Navigator {
        Arc::clone(&self.navigator)
    }

    /// A sender into the flow channel, for external event injection.
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Drain the flow channel until the app shuts down.
    pub async fn run(mut self, mut messages: UnboundedReceiver<FlowMessage>) {
        while let Some(message) = messages.recv().await {
            self.dispatch(message);
        }
        self.stop();
    }

    /// Deliver one message to the flow that owns it.
    pub fn dispatch(&mut self, message: FlowMessage) {
        match message {
            FlowMessage::App(event) => self.process_event(event),
            FlowMessage::Auth(event) => match &mut self.auth_flow {
                Some(flow) => flow.process_event(event),
                None => tracing::debug!(event = ?event, "auth event with no active flow, dropping"),
            },
            FlowMessage::Session(event) => match &mut self.session_flow {
                Some(flow) => flow.process_event(event),
                None => {
                    tracing::debug!(event = ?event, "session event with no active flow, dropping");
                },
            },
            FlowMessage::Backup(event) => match &mut self.session_flow {
                Some(flow) => flow.dispatch_backup(event),
                None => {
                    tracing::debug!(event = ?event, "backup event with no active session, dropping");
                },
            },
        }
    }

    /// Translate an external activation into the session flow's own events.
    /// Dropped with a log when no session is active.
    pub fn handle_route(&mut self, route: AppRoute) {
        if self.state() != AppState::SignedIn {
            tracing::info!(route = ?route, "deep link before sign-in, dropping");
            return;
        }
        let event = match route {
            AppRoute::Room(room_id) => SessionEvent::SelectRoom(room_id),
            AppRoute::Settings => SessionEvent::ShowSettings,
            AppRoute::SecureBackup => SessionEvent::ShowSecureBackup,
        };
        self.dispatch(FlowMessage::Session(event));
    }

    /// Feed one event, then drain everything it cascades into.
    pub fn process_event(&mut self, event: AppEvent) {
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

    fn on_transition(&mut self, transition: &Transition<AppState, AppEvent>) {
        match (transition.to, &transition.event) {
            (AppState::SignedOut, event) => {
                if let AppEvent::RestoreFailed(error) = event {
                    tracing::warn!(%error, "session restore failed, falling back to login");
                }
                self.teardown_session_flow();
                self.mount_auth_flow();
            },
            (AppState::RestoringSession, _) => self.restore_session(),
            (AppState::SignedIn, AppEvent::SessionCreated(session)) => {
                tracing::info!(user_id = %session.user_id, "session established");
                self.teardown_auth_flow();
                self.mount_session_flow();
            },
            (AppState::SigningOut, _) => self.sign_out(),
            _ => {},
        }
    }

    fn on_rejected(&mut self, rejected: &Rejected<AppState, AppEvent>) {
        match rejected.event {
            // A repeated completion or a second sign-out tap arrives late
            // and means nothing by then.
            AppEvent::CompletedSignOut | AppEvent::SignOutRequested => {
                tracing::debug!(state = ?rejected.state, event = ?rejected.event, "stale app event, ignoring");
            },
            ref event => {
                tracing::warn!(state = ?rejected.state, event = ?event, "unhandled app event");
            },
        }
    }

    fn mount_auth_flow(&mut self) {
        let sink = self.sink.clone();
        let mut flow = AuthenticationFlowCoordinator::new(
            Arc::clone(&self.client),
            Arc::clone(&self.navigator),
            self.sink.clone(),
            move |AuthOutcome::SignedIn(session)| {
                sink.send(AppEvent::SessionCreated(session));
            },
        );
        flow.start();
        self.auth_flow = Some(flow);
    }

    fn teardown_auth_flow(&mut self) {
        if let Some(mut flow) = self.auth_flow.take() {
            flow.stop();
        }
    }

    fn mount_session_flow(&mut self) {
        let sink = self.sink.clone();
        let mut flow = UserSessionFlowCoordinator::new(
            Arc::clone(&self.client),
            Arc::clone(&self.settings),
            Arc::clone(&self.navigator),
            self.sink.clone(),
            move |SessionFlowOutcome::SignOutRequested| {
                sink.send(AppEvent::SignOutRequested);
            },
        );
        flow.start();
        self.session_flow = Some(flow);
    }

    fn teardown_session_flow(&mut self) {
        if let Some(mut flow) = self.session_flow.take() {
            flow.stop();
        }
    }

    fn restore_session(&mut self) {
        let client = Arc::clone(&self.client);
        let sink = self.sink.clone();
        self.tasks.spawn(async move {
            match client.restore_session().await {
                Ok(session) => sink.send(AppEvent::SessionCreated(session)),
                Err(error) => sink.send(AppEvent::RestoreFailed(error)),
            }
        });
    }

    fn sign_out(&mut self) {
        let client = Arc::clone(&self.client);
        let sink = self.sink.clone();
        self.tasks.spawn(async move {
            if let Err(error) = client.sign_out().await {
                // Local teardown proceeds regardless; the session is gone
                // from the user's point of view.
                tracing::warn!(%error, "sign out failed on the homeserver");
            }
            sink.send(AppEvent::CompletedSignOut);
        });
    }
}

impl Coordinator for AppCoordinator {
    fn start(&mut self) {
        debug_assert!(!self.started, "app coordinator started twice");
        self.started = true;

        let event = if self.client.has_session() {
            AppEvent::StartWithExistingSession
        } else {
            AppEvent::StartWithAuthentication
        };
        self.process_event(event);
    }

    fn stop(&mut self) {
        self.teardown_session_flow();
        self.teardown_auth_flow();
        self.tasks.cancel_all();
    }
}
