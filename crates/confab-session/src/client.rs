//! The chat SDK contract and its boundary value types.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::ClientError;

/// Opaque room identifier assigned by the homeserver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// What the user typed into the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Both fields non-empty, the minimum worth submitting.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// An established session, as reported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// The logged-in user.
    pub user_id: String,
    /// This device's identifier within the account.
    pub device_id: String,
}

/// One room in the user's room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Whether the room has unread activity.
    pub has_unread: bool,
}

/// Recovery key produced when key backup is enabled.
///
/// Displayed to the user exactly once; the flow layer never persists it.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoveryKey(String);

impl RecoveryKey {
    /// Wrap a key produced by the SDK.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key material, for display.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs.
        f.write_str("RecoveryKey(..)")
    }
}

/// The chat SDK as the flow layer sees it.
///
/// Implementations wrap the native SDK in production and scripted doubles in
/// tests. Every operation returns a typed result; callers re-issue calls
/// themselves when retry is wanted.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Whether a session is persisted on this device.
    fn has_session(&self) -> bool;

    /// Authenticate with the homeserver.
    async fn login(&self, credentials: Credentials) -> Result<SessionInfo, ClientError>;

    /// Reopen the session persisted on this device.
    async fn restore_session(&self) -> Result<SessionInfo, ClientError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ClientError>;

    /// Enable key backup, producing a fresh recovery key.
    async fn enable_backup(&self) -> Result<RecoveryKey, ClientError>;

    /// Current room list snapshot.
    fn room_summaries(&self) -> Vec<RoomSummary>;

    /// Push-style room list updates.
    fn subscribe_rooms(&self) -> watch::Receiver<Vec<RoomSummary>>;
}
