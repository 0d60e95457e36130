//! Flow coordinators for Confab.
//!
//! Each multi-screen flow (authentication, the user session, secure backup
//! setup) is a coordinator owning one state machine. External occurrences —
//! view-model callbacks, child-flow completions, deep links — become machine
//! events; committed transitions mount and unmount screens on a shared
//! [`NavigationStack`] and occasionally signal a flow-level result to the
//! parent.
//!
//! # Composition
//!
//! [`AppCoordinator`] is the composition root: it receives every external
//! collaborator at construction, owns the top-level machine
//! (signed out / restoring / signed in / signing out), and creates or
//! discards the child flows as its transitions commit. Coordinators form a
//! strict ownership tree; results travel upward only through completion
//! callbacks injected at construction.
//!
//! All coordinator and view-model mutation happens on one logical task.
//! Spawned SDK calls marshal their completions back as [`FlowMessage`]s on
//! the app's single event channel; messages addressed to a flow that has
//! been torn down are dropped with a debug log.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod app;
mod auth;
mod backup;
mod coordinator;
mod message;
mod navigation;
mod screens;
mod session;

pub use app::{AppCoordinator, AppEvent, AppEventKind, AppRoute, AppState};
pub use auth::{AuthEvent, AuthEventKind, AuthOutcome, AuthState, AuthenticationFlowCoordinator};
pub use backup::{
    BackupEvent, BackupEventKind, BackupOutcome, BackupState, SecureBackupFlowCoordinator,
};
pub use coordinator::Coordinator;
pub use message::{EventSink, FlowMessage};
pub use navigation::{
    NavigationStack, Navigator, NoopPresenter, Presenter, Screen, ScreenKind, navigator,
};
pub use screens::backup_screen::{
    BackupScreenAction, BackupScreenBindings, BackupScreenState, BackupScreenViewModel,
    BackupScreenViewModelAction,
};
pub use screens::login_screen::{
    LoginScreenAction, LoginScreenBindings, LoginScreenState, LoginScreenViewModel,
    LoginScreenViewModelAction,
};
pub use screens::room_list::{
    RoomListAction, RoomListBindings, RoomListState, RoomListViewModel, RoomListViewModelAction,
};
pub use screens::settings_screen::{
    SettingsScreenAction, SettingsScreenBindings, SettingsScreenState, SettingsScreenViewModel,
    SettingsScreenViewModelAction,
};
pub use session::{
    SessionEvent, SessionEventKind, SessionFlowOutcome, SessionState, SessionStateKind,
    UserSessionFlowCoordinator,
};
