//! Typed failures crossing the SDK boundary.

use thiserror::Error;

/// Errors surfaced by [`ChatClient`](crate::ChatClient) operations.
///
/// The flow layer turns these into user-visible state (an alert field, a
/// retry affordance); it never swallows one silently and never retries on
/// its own initiative.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The homeserver rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("account deactivated")]
    AccountDeactivated,

    /// No persisted session exists on this device.
    #[error("no session to restore")]
    NoSessionToRestore,

    /// Key backup is already enabled for this account.
    #[error("backup already exists")]
    BackupExists,

    /// The request never reached the homeserver.
    #[error("network failure: {0}")]
    Network(String),

    /// The SDK failed internally.
    #[error("sdk failure: {0}")]
    Sdk(String),
}

impl ClientError {
    /// Whether re-issuing the same call may plausibly succeed.
    ///
    /// Network failures are transient; credential and account problems are
    /// not, and retrying them only re-surfaces the same alert.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
