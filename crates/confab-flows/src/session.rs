//! The user session flow.
//!
//! Active while a session exists: room list and timeline navigation, the
//! settings screen, and the secure backup sub-flow. The selected room is
//! part of the flow state and is threaded through every sideways move, so
//! dismissing settings lands the user back on the timeline they left.

use std::collections::VecDeque;
use std::sync::Arc;

use confab_machine::{
    HandlerPattern, Machine, MachineBuilder, MachineEvent, MachineState, Pattern, Rejected, Route,
    Transition,
};
use confab_session::{ChatClient, RoomId, SettingsStore};
use confab_store::ViewModelHandle;

use crate::backup::{BackupEvent, SecureBackupFlowCoordinator};
use crate::coordinator::Coordinator;
use crate::message::EventSink;
use crate::navigation::{Navigator, Screen, with_nav};
use crate::screens::room_list::{RoomListViewModel, RoomListViewModelAction};
use crate::screens::settings_screen::{SettingsScreenViewModel, SettingsScreenViewModelAction};

/// States of the user session flow. Every variant carries the selected room
/// so sideways navigation preserves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Showing the room list, with a room's timeline beside it if selected.
    RoomList {
        /// The room whose timeline is shown.
        selected: Option<RoomId>,
    },
    /// Showing the settings screen.
    Settings {
        /// Selection to restore on dismissal.
        selected: Option<RoomId>,
    },
    /// Running the secure backup sub-flow.
    SecureBackup {
        /// Selection to restore on dismissal.
        selected: Option<RoomId>,
    },
}

impl SessionState {
    /// The selected room, wherever the flow currently is.
    pub fn selected(&self) -> Option<&RoomId> {
        match self {
            Self::RoomList { selected }
            | Self::Settings { selected }
            | Self::SecureBackup { selected } => selected.as_ref(),
        }
    }
}

/// Discriminants of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStateKind {
    /// [`SessionState::RoomList`].
    RoomList,
    /// [`SessionState::Settings`].
    Settings,
    /// [`SessionState::SecureBackup`].
    SecureBackup,
}

impl MachineState for SessionState {
    type Kind = SessionStateKind;

    fn kind(&self) -> SessionStateKind {
        match self {
            Self::RoomList { .. } => SessionStateKind::RoomList,
            Self::Settings { .. } => SessionStateKind::Settings,
            Self::SecureBackup { .. } => SessionStateKind::SecureBackup,
        }
    }
}

/// Events driving the user session flow. Deep links produce exactly the same
/// events as taps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Show a room's timeline.
    SelectRoom(RoomId),
    /// Close the timeline.
    DeselectRoom,
    /// Present the settings screen.
    ShowSettings,
    /// The settings screen was dismissed.
    DismissedSettings,
    /// Start the secure backup sub-flow.
    ShowSecureBackup,
    /// The secure backup sub-flow finished.
    DismissedSecureBackup,
    /// The user asked to sign out.
    SignOutRequested,
}

/// Discriminants of [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    /// [`SessionEvent::SelectRoom`].
    SelectRoom,
    /// [`SessionEvent::DeselectRoom`].
    DeselectRoom,
    /// [`SessionEvent::ShowSettings`].
    ShowSettings,
    /// [`SessionEvent::DismissedSettings`].
    DismissedSettings,
    /// [`SessionEvent::ShowSecureBackup`].
    ShowSecureBackup,
    /// [`SessionEvent::DismissedSecureBackup`].
    DismissedSecureBackup,
    /// [`SessionEvent::SignOutRequested`].
    SignOutRequested,
}

impl MachineEvent for SessionEvent {
    type Kind = SessionEventKind;

    fn kind(&self) -> SessionEventKind {
        match self {
            Self::SelectRoom(_) => SessionEventKind::SelectRoom,
            Self::DeselectRoom => SessionEventKind::DeselectRoom,
            Self::ShowSettings => SessionEventKind::ShowSettings,
            Self::DismissedSettings => SessionEventKind::DismissedSettings,
            Self::ShowSecureBackup => SessionEventKind::ShowSecureBackup,
            Self::DismissedSecureBackup => SessionEventKind::DismissedSecureBackup,
            Self::SignOutRequested => SessionEventKind::SignOutRequested,
        }
    }
}

/// How the flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlowOutcome {
    /// The user asked to sign out; the parent owns the actual sign-out.
    SignOutRequested,
}

type CompletionCallback = Box<dyn FnOnce(SessionFlowOutcome) + Send>;

#[allow(clippy::expect_used, reason = "static route table, validated by the tests below")]
fn build_machine() -> Machine<SessionState, SessionEvent> {
    MachineBuilder::new(SessionState::RoomList { selected: None })
        .route(Route::map(
            SessionStateKind::RoomList,
            SessionEventKind::SelectRoom,
            |_, event: &SessionEvent| {
                let SessionEvent::SelectRoom(room_id) = event else { return None };
                Some(SessionState::RoomList { selected: Some(room_id.clone()) })
            },
        ))
        .route(Route::new(
            SessionStateKind::RoomList,
            SessionEventKind::DeselectRoom,
            SessionState::RoomList { selected: None },
        ))
        .route(Route::map(
            SessionStateKind::RoomList,
            SessionEventKind::ShowSettings,
            |state: &SessionState, _| {
                Some(SessionState::Settings { selected: state.selected().cloned() })
            },
        ))
        .route(Route::map(
            SessionStateKind::Settings,
            SessionEventKind::DismissedSettings,
            |state: &SessionState, _| {
                Some(SessionState::RoomList { selected: state.selected().cloned() })
            },
        ))
        .route(Route::map(
            SessionStateKind::RoomList,
            SessionEventKind::ShowSecureBackup,
            |state: &SessionState, _| {
                Some(SessionState::SecureBackup { selected: state.selected().cloned() })
            },
        ))
        .route(Route::map(
            SessionStateKind::SecureBackup,
            SessionEventKind::DismissedSecureBackup,
            |state: &SessionState, _| {
                Some(SessionState::RoomList { selected: state.selected().cloned() })
            },
        ))
        // Sign-out is a flow result, not a place; the state stays put and
        // the transition handler reports upward.
        .route(Route::map(Pattern::Any, SessionEventKind::SignOutRequested, |state: &SessionState, _| {
            Some(state.clone())
        }))
        .build()
        .expect("session route table is unambiguous")
}

/// Coordinator for the user session flow.
pub struct UserSessionFlowCoordinator {
    machine: Machine<SessionState, SessionEvent>,
    client: Arc<dyn ChatClient>,
    settings: Arc<dyn SettingsStore>,
    navigator: Navigator,
    sink: EventSink,
    on_complete: Option<CompletionCallback>,
    room_list: Option<ViewModelHandle<RoomListViewModel>>,
    settings_screen: Option<ViewModelHandle<SettingsScreenViewModel>>,
    backup_flow: Option<SecureBackupFlowCoordinator>,
    pending: VecDeque<SessionEvent>,
    draining: bool,
    started: bool,
}

impl UserSessionFlowCoordinator {
    /// Create the flow. `on_complete` fires at most once, when the user asks
    /// to sign out.
    pub fn new(
        client: Arc<dyn ChatClient>,
        settings: Arc<dyn SettingsStore>,
        navigator: Navigator,
        sink: EventSink,
        on_complete: impl FnOnce(SessionFlowOutcome) + Send + 'static,
    ) -> Self {
        let mut machine = build_machine();
        machine.on_transition(HandlerPattern::any(), |commit, _| {
            tracing::info!(from = ?commit.from, to = ?commit.to, "session transition");
        });

        Self {
            machine,
            client,
            settings,
            navigator,
            sink,
            on_complete: Some(Box::new(on_complete)),
            room_list: None,
            settings_screen: None,
            backup_flow: None,
            pending: VecDeque::new(),
            draining: false,
            started: false,
        }
    }

    /// Current flow state.
    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    /// Feed one event, then drain everything it cascades into.
    pub fn process_event(&mut self, event: SessionEvent) {
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

    /// Route an event to the backup sub-flow, or drop it if the sub-flow has
    /// been torn down — a late SDK completion, not an error.
    pub(crate) fn dispatch_backup(&mut self, event: BackupEvent) {
        match &mut self.backup_flow {
            Some(flow) => flow.process_event(event),
            None => {
                tracing::debug!(event = ?event, "backup event with no active backup flow, dropping");
            },
        }
    }

    fn on_transition(&mut self, transition: &Transition<SessionState, SessionEvent>) {
        if transition.event == SessionEvent::SignOutRequested {
            self.complete(SessionFlowOutcome::SignOutRequested);
            return;
        }

        match (&transition.from, &transition.to) {
            (
                SessionState::RoomList { selected: from_selected },
                SessionState::RoomList { selected: to_selected },
            ) => {
                self.sync_timeline(from_selected.as_ref(), to_selected.as_ref());
            },
            (SessionState::RoomList { .. }, SessionState::Settings { .. }) => {
                self.present_settings();
            },
            (SessionState::Settings { .. }, SessionState::RoomList { .. }) => {
                self.settings_screen = None;
                with_nav(&self.navigator, |nav| nav.pop());
            },
            (SessionState::RoomList { .. }, SessionState::SecureBackup { .. }) => {
                self.start_backup_flow();
            },
            (SessionState::SecureBackup { .. }, SessionState::RoomList { .. }) => {
                if let Some(mut flow) = self.backup_flow.take() {
                    flow.stop();
                }
                with_nav(&self.navigator, |nav| nav.dismiss_sheet());
            },
            _ => {},
        }
    }

    fn on_rejected(&mut self, rejected: &Rejected<SessionState, SessionEvent>) {
        match rejected.event {
            // A second dismissal or deselection arriving late is routine.
            SessionEvent::DeselectRoom
            | SessionEvent::DismissedSettings
            | SessionEvent::DismissedSecureBackup => {
                tracing::debug!(state = ?rejected.state, event = ?rejected.event, "stale dismissal, ignoring");
            },
            ref event => {
                tracing::warn!(state = ?rejected.state, event = ?event, "unhandled session event");
            },
        }
    }

    fn sync_timeline(&self, from: Option<&RoomId>, to: Option<&RoomId>) {
        with_nav(&self.navigator, |nav| match (from, to) {
            (None, Some(room_id)) => nav.push(Screen::RoomTimeline { room_id: room_id.clone() }),
            (Some(_), None) => nav.pop(),
            (Some(previous), Some(room_id)) if previous != room_id => {
                nav.pop();
                nav.push(Screen::RoomTimeline { room_id: room_id.clone() });
            },
            _ => {},
        });
    }

    fn present_settings(&mut self) {
        let sink = self.sink.clone();
        let screen = ViewModelHandle::new(SettingsScreenViewModel::new(
            &self.settings,
            move |action| {
                let event = match action {
                    SettingsScreenViewModelAction::Done => SessionEvent::DismissedSettings,
                    SettingsScreenViewModelAction::SignOut => SessionEvent::SignOutRequested,
                };
                sink.send(event);
            },
        ));
        with_nav(&self.navigator, |nav| nav.push(Screen::Settings(screen.context())));
        self.settings_screen = Some(screen);
    }

    fn start_backup_flow(&mut self) {
        let sink = self.sink.clone();
        let mut flow = SecureBackupFlowCoordinator::new(
            Arc::clone(&self.client),
            Arc::clone(&self.navigator),
            self.sink.clone(),
            move |outcome| {
                tracing::info!(?outcome, "backup flow finished");
                sink.send(SessionEvent::DismissedSecureBackup);
            },
        );
        flow.start();
        self.backup_flow = Some(flow);
    }

    fn complete(&mut self, outcome: SessionFlowOutcome) {
        if let Some(callback) = self.on_complete.take() {
            callback(outcome);
        }
    }
}

impl Coordinator for UserSessionFlowCoordinator {
    fn start(&mut self) {
        debug_assert!(!self.started, "session flow started twice");
        self.started = true;

        let sink = self.sink.clone();
        let room_list = ViewModelHandle::new(RoomListViewModel::new(&self.client, move |action| {
            let event = match action {
                RoomListViewModelAction::SelectRoom(room_id) => SessionEvent::SelectRoom(room_id),
                RoomListViewModelAction::OpenSettings => SessionEvent::ShowSettings,
                RoomListViewModelAction::OpenSecureBackup => SessionEvent::ShowSecureBackup,
            };
            sink.send(event);
        }));
        with_nav(&self.navigator, |nav| nav.set_root(Screen::RoomList(room_list.context())));
        self.room_list = Some(room_list);
    }

    fn stop(&mut self) {
        self.on_complete = None;
        if let Some(mut flow) = self.backup_flow.take() {
            flow.stop();
        }
        self.settings_screen = None;
        self.room_list = None;
    }
}
