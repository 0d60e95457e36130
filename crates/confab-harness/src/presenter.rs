//! Navigation-recording presenter double.

use std::sync::{Arc, Mutex, PoisonError};

use confab_flows::{Presenter, Screen, ScreenKind};

/// One navigation change, reduced to screen kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedScreens {
    /// The stack, root first.
    pub stack: Vec<ScreenKind>,
    /// The modal sheet, if one is up.
    pub sheet: Option<ScreenKind>,
}

/// A [`Presenter`] that records every change it is shown.
///
/// Clone it before boxing; all clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    log: Arc<Mutex<Vec<PresentedScreens>>>,
}

impl RecordingPresenter {
    /// A presenter with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every change seen so far, oldest first.
    pub fn snapshots(&self) -> Vec<PresentedScreens> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The most recent change.
    pub fn last(&self) -> Option<PresentedScreens> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn screens_changed(&mut self, stack: &[Screen], sheet: Option<&Screen>) {
        let snapshot = PresentedScreens {
            stack: stack.iter().map(Screen::kind).collect(),
            sheet: sheet.map(Screen::kind),
        };
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(snapshot);
    }
}
