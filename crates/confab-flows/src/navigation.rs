//! The mounted-screen stack and the rendering-layer capability.

use std::sync::{Arc, Mutex, PoisonError};

use confab_session::RoomId;
use confab_store::Context;

use crate::screens::backup_screen::BackupScreenViewModel;
use crate::screens::login_screen::LoginScreenViewModel;
use crate::screens::room_list::RoomListViewModel;
use crate::screens::settings_screen::SettingsScreenViewModel;

/// A mounted presentation unit: which screen, plus the context the rendering
/// layer drives it through.
#[derive(Debug, Clone)]
pub enum Screen {
    /// The login form.
    Login(Context<LoginScreenViewModel>),
    /// The room list.
    RoomList(Context<RoomListViewModel>),
    /// A room's timeline. Timeline content is rendered straight from the
    /// SDK; the flow layer only decides that the screen is showing.
    RoomTimeline {
        /// The room being shown.
        room_id: RoomId,
    },
    /// The settings screen.
    Settings(Context<SettingsScreenViewModel>),
    /// Secure backup setup, intro step.
    SecureBackupIntro(Context<BackupScreenViewModel>),
    /// Secure backup setup, recovery key step.
    SecureBackupKey(Context<BackupScreenViewModel>),
}

impl Screen {
    /// Payload-free tag, for dispatch and assertions.
    pub fn kind(&self) -> ScreenKind {
        match self {
            Self::Login(_) => ScreenKind::Login,
            Self::RoomList(_) => ScreenKind::RoomList,
            Self::RoomTimeline { .. } => ScreenKind::RoomTimeline,
            Self::Settings(_) => ScreenKind::Settings,
            Self::SecureBackupIntro(_) => ScreenKind::SecureBackupIntro,
            Self::SecureBackupKey(_) => ScreenKind::SecureBackupKey,
        }
    }
}

/// Payload-free identification of a [`Screen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    /// The login form.
    Login,
    /// The room list.
    RoomList,
    /// A room's timeline.
    RoomTimeline,
    /// The settings screen.
    Settings,
    /// Secure backup setup, intro step.
    SecureBackupIntro,
    /// Secure backup setup, recovery key step.
    SecureBackupKey,
}

/// What the rendering layer implements to mirror the mounted screens.
///
/// Called after every navigation change with the full stack and the sheet,
/// if any. Supplied at composition time; [`NoopPresenter`] stands in when no
/// renderer is attached (headless tests, early startup).
pub trait Presenter: Send {
    /// The mounted screens changed.
    fn screens_changed(&mut self, stack: &[Screen], sheet: Option<&Screen>);
}

/// Presenter that ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn screens_changed(&mut self, _stack: &[Screen], _sheet: Option<&Screen>) {}
}

/// The ordered stack of mounted screens plus an optional modal sheet.
///
/// Owned by the composition root and shared with every flow; coordinators
/// are the only writers. Each mutation notifies the presenter exactly once.
pub struct NavigationStack {
    stack: Vec<Screen>,
    sheet: Option<Screen>,
    presenter: Box<dyn Presenter>,
}

impl NavigationStack {
    /// An empty stack reporting to the given presenter.
    pub fn new(presenter: Box<dyn Presenter>) -> Self {
        Self { stack: Vec::new(), sheet: None, presenter }
    }

    /// Replace everything — stack and sheet — with a single root screen.
    pub fn set_root(&mut self, screen: Screen) {
        self.stack.clear();
        self.sheet = None;
        self.stack.push(screen);
        self.notify();
    }

    /// Push a screen onto the stack.
    pub fn push(&mut self, screen: Screen) {
        self.stack.push(screen);
        self.notify();
    }

    /// Pop the top screen. The root never pops; a duplicate pop is a logged
    /// no-op, not an error.
    pub fn pop(&mut self) {
        if self.stack.len() <= 1 {
            tracing::debug!("pop with no pushed screen, ignoring");
            return;
        }
        self.stack.pop();
        self.notify();
    }

    /// Present a modal sheet over the stack, replacing any current sheet.
    pub fn present_sheet(&mut self, screen: Screen) {
        self.sheet = Some(screen);
        self.notify();
    }

    /// Dismiss the sheet, if one is up.
    pub fn dismiss_sheet(&mut self) {
        if self.sheet.take().is_some() {
            self.notify();
        }
    }

    /// The mounted stack, root first.
    pub fn stack(&self) -> &[Screen] {
        &self.stack
    }

    /// The current sheet.
    pub fn sheet(&self) -> Option<&Screen> {
        self.sheet.as_ref()
    }

    /// The screen the user currently sees: the sheet, else the stack top.
    pub fn top(&self) -> Option<&Screen> {
        self.sheet.as_ref().or_else(|| self.stack.last())
    }

    fn notify(&mut self) {
        self.presenter.screens_changed(&self.stack, self.sheet.as_ref());
    }
}

impl std::fmt::Debug for NavigationStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationStack")
            .field("stack", &self.stack.iter().map(Screen::kind).collect::<Vec<_>>())
            .field("sheet", &self.sheet.as_ref().map(Screen::kind))
            .finish()
    }
}

/// Shared handle flows mutate the stack through.
pub type Navigator = Arc<Mutex<NavigationStack>>;

/// Wrap a stack for sharing across the coordinator tree.
pub fn navigator(presenter: Box<dyn Presenter>) -> Navigator {
    Arc::new(Mutex::new(NavigationStack::new(presenter)))
}

/// Run a closure against the shared stack.
pub(crate) fn with_nav<R>(navigator: &Navigator, f: impl FnOnce(&mut NavigationStack) -> R) -> R {
    let mut guard = navigator.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}
