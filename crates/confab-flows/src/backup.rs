//! The secure backup setup flow.
//!
//! A modal sub-flow of the user session: explain, create the backup through
//! the SDK, show the recovery key once, and complete when the user confirms
//! they saved it. Cancellation is allowed at any step and completes the flow
//! with a `Cancelled` outcome; the parent dismisses the sheet either way.

use std::collections::VecDeque;
use std::sync::Arc;

use confab_machine::{
    HandlerPattern, Machine, MachineBuilder, MachineEvent, MachineState, Pattern, Rejected, Route,
    Transition,
};
use confab_session::{ChatClient, ClientError, RecoveryKey};
use confab_store::{SubscriptionSet, ViewModelHandle};

use crate::coordinator::Coordinator;
use crate::message::EventSink;
use crate::navigation::{Navigator, Screen, with_nav};
use crate::screens::backup_screen::{BackupScreenViewModel, BackupScreenViewModelAction};

/// States of the backup setup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupState {
    /// Showing the intro step.
    Intro,
    /// The SDK is creating the backup.
    CreatingBackup,
    /// Showing the recovery key.
    KeyGenerated,
    /// The flow is done, completed or cancelled.
    Complete,
}

impl MachineState for BackupState {
    type Kind = Self;

    fn kind(&self) -> Self {
        *self
    }
}

/// Events driving the backup setup flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupEvent {
    /// The user asked to create the backup.
    Continue,
    /// The SDK created the backup.
    BackupCreated(RecoveryKey),
    /// The SDK could not create the backup.
    BackupFailed(ClientError),
    /// The user confirmed the key is saved.
    Acknowledged,
    /// The user abandoned setup.
    Cancelled,
}

/// Discriminants of [`BackupEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupEventKind {
    /// [`BackupEvent::Continue`].
    Continue,
    /// [`BackupEvent::BackupCreated`].
    BackupCreated,
    /// [`BackupEvent::BackupFailed`].
    BackupFailed,
    /// [`BackupEvent::Acknowledged`].
    Acknowledged,
    /// [`BackupEvent::Cancelled`].
    Cancelled,
}

impl MachineEvent for BackupEvent {
    type Kind = BackupEventKind;

    fn kind(&self) -> BackupEventKind {
        match self {
            Self::Continue => BackupEventKind::Continue,
            Self::BackupCreated(_) => BackupEventKind::BackupCreated,
            Self::BackupFailed(_) => BackupEventKind::BackupFailed,
            Self::Acknowledged => BackupEventKind::Acknowledged,
            Self::Cancelled => BackupEventKind::Cancelled,
        }
    }
}

/// How the flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Backup is enabled and the key is confirmed saved.
    Completed,
    /// The user abandoned setup.
    Cancelled,
}

type CompletionCallback = Box<dyn FnOnce(BackupOutcome) + Send>;

#[allow(clippy::expect_used, reason = "static route table, validated by the tests below")]
fn build_machine() -> Machine<BackupState, BackupEvent> {
    MachineBuilder::new(BackupState::Intro)
        .route(Route::new(BackupState::Intro, BackupEventKind::Continue, BackupState::CreatingBackup))
        .route(Route::new(
            BackupState::CreatingBackup,
            BackupEventKind::BackupCreated,
            BackupState::KeyGenerated,
        ))
        .route(Route::new(
            BackupState::CreatingBackup,
            BackupEventKind::BackupFailed,
            BackupState::Intro,
        ))
        .route(Route::new(BackupState::KeyGenerated, BackupEventKind::Acknowledged, BackupState::Complete))
        // Cancel works from every step except after completion, where a
        // duplicate cancellation is an expected no-op.
        .route(Route::map(Pattern::Any, BackupEventKind::Cancelled, |state: &BackupState, _| {
            (*state != BackupState::Complete).then_some(BackupState::Complete)
        }))
        .build()
        .expect("backup route table is unambiguous")
}

/// Coordinator for the secure backup setup flow.
pub struct SecureBackupFlowCoordinator {
    machine: Machine<BackupState, BackupEvent>,
    client: Arc<dyn ChatClient>,
    navigator: Navigator,
    sink: EventSink,
    on_complete: Option<CompletionCallback>,
    screen: Option<ViewModelHandle<BackupScreenViewModel>>,
    tasks: SubscriptionSet,
    pending: VecDeque<BackupEvent>,
    draining: bool,
    started: bool,
}

impl SecureBackupFlowCoordinator {
    /// Create the flow. `on_complete` fires at most once, with the outcome.
    pub fn new(
        client: Arc<dyn ChatClient>,
        navigator: Navigator,
        sink: EventSink,
        on_complete: impl FnOnce(BackupOutcome) + Send + 'static,
    ) -> Self {
        let mut machine = build_machine();
        machine.on_transition(HandlerPattern::any(), |commit, _| {
            tracing::info!(from = ?commit.from, to = ?commit.to, "backup transition");
        });

        Self {
            machine,
            client,
            navigator,
            sink,
            on_complete: Some(Box::new(on_complete)),
            screen: None,
            tasks: SubscriptionSet::new(),
            pending: VecDeque::new(),
            draining: false,
            started: false,
        }
    }

    /// Current flow state.
    pub fn state(&self) -> BackupState {
        *self.machine.state()
    }

    /// Feed one event, then drain everything it cascades into.
    pub fn process_event(&mut self, event: BackupEvent) {
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

    fn on_transition(&mut self, transition: &Transition<BackupState, BackupEvent>) {
        match (transition.to, &transition.event) {
            (BackupState::CreatingBackup, BackupEvent::Continue) => self.create_backup(),
            (BackupState::KeyGenerated, BackupEvent::BackupCreated(key)) => {
                if let Some(screen) = &self.screen {
                    screen.with(|vm| vm.show_recovery_key(key));
                    with_nav(&self.navigator, |nav| {
                        nav.present_sheet(Screen::SecureBackupKey(screen.context()));
                    });
                }
            },
            (BackupState::Intro, BackupEvent::BackupFailed(error)) => {
                if let Some(screen) = &self.screen {
                    screen.with(|vm| vm.backup_failed(error));
                }
            },
            (BackupState::Complete, BackupEvent::Acknowledged) => {
                self.complete(BackupOutcome::Completed);
            },
            (BackupState::Complete, BackupEvent::Cancelled) => {
                self.complete(BackupOutcome::Cancelled);
            },
            _ => {},
        }
    }

    fn on_rejected(&mut self, rejected: &Rejected<BackupState, BackupEvent>) {
        match rejected.event {
            BackupEvent::Cancelled => {
                tracing::debug!("duplicate cancellation, ignoring");
            },
            ref event => {
                tracing::warn!(state = ?rejected.state, event = ?event, "unhandled backup event");
            },
        }
    }

    fn create_backup(&mut self) {
        let client = Arc::clone(&self.client);
        let sink = self.sink.clone();
        self.tasks.spawn(async move {
            match client.enable_backup().await {
                Ok(key) => sink.send(BackupEvent::BackupCreated(key)),
                Err(error) => sink.send(BackupEvent::BackupFailed(error)),
            }
        });
    }

    fn complete(&mut self, outcome: BackupOutcome) {
        if let Some(callback) = self.on_complete.take() {
            callback(outcome);
        }
    }
}

impl Coordinator for SecureBackupFlowCoordinator {
    fn start(&mut self) {
        debug_assert!(!self.started, "backup flow started twice");
        self.started = true;

        let sink = self.sink.clone();
        let screen = ViewModelHandle::new(BackupScreenViewModel::new(move |action| {
            let event = match action {
                BackupScreenViewModelAction::Continue => BackupEvent::Continue,
                BackupScreenViewModelAction::Acknowledged => BackupEvent::Acknowledged,
                BackupScreenViewModelAction::Cancelled => BackupEvent::Cancelled,
            };
            sink.send(event);
        }));
        with_nav(&self.navigator, |nav| {
            nav.present_sheet(Screen::SecureBackupIntro(screen.context()));
        });
        self.screen = Some(screen);
    }

    fn stop(&mut self) {
        self.on_complete = None;
        self.tasks.cancel_all();
        self.screen = None;
    }
}
