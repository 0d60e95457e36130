//! The app-wide flow event channel.

use tokio::sync::mpsc;

use crate::app::AppEvent;
use crate::auth::AuthEvent;
use crate::backup::BackupEvent;
use crate::session::SessionEvent;

/// An event addressed to one flow in the coordinator tree.
///
/// Everything that happens asynchronously — SDK call completions, view-model
/// callbacks, child completions — travels through this one type on one
/// channel, so events are processed strictly in arrival order. The
/// [`AppCoordinator`](crate::AppCoordinator) dispatches each message to the
/// flow that owns it, or drops it when that flow has been torn down.
#[derive(Debug)]
pub enum FlowMessage {
    /// For the top-level app flow.
    App(AppEvent),
    /// For the authentication flow.
    Auth(AuthEvent),
    /// For the user session flow.
    Session(SessionEvent),
    /// For the secure backup flow.
    Backup(BackupEvent),
}

impl From<AppEvent> for FlowMessage {
    fn from(event: AppEvent) -> Self {
        Self::App(event)
    }
}

impl From<AuthEvent> for FlowMessage {
    fn from(event: AuthEvent) -> Self {
        Self::Auth(event)
    }
}

impl From<SessionEvent> for FlowMessage {
    fn from(event: SessionEvent) -> Self {
        Self::Session(event)
    }
}

impl From<BackupEvent> for FlowMessage {
    fn from(event: BackupEvent) -> Self {
        Self::Backup(event)
    }
}

/// Cloneable sender half of the flow channel.
///
/// Handed to view models and spawned tasks; sending never blocks. A send
/// after the receiving loop has shut down is dropped with a debug log — the
/// app is going away and late completions have nowhere meaningful to land.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<FlowMessage>,
}

impl EventSink {
    /// Create a sink and the receiver the app loop drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FlowMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event for its owning flow.
    pub fn send(&self, message: impl Into<FlowMessage>) {
        if self.tx.send(message.into()).is_err() {
            tracing::debug!("flow channel closed, dropping message");
        }
    }
}
