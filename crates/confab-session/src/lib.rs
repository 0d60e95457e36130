//! Contracts between Confab's flow layer and its external collaborators.
//!
//! The chat protocol engine, end-to-end cryptography, and sync machinery
//! live in an external SDK; persisted settings live in platform storage.
//! This crate defines the narrow async contracts Confab consumes from both,
//! plus the value types that cross those boundaries. Every SDK operation is
//! an async call returning a typed success or [`ClientError`] — the flow
//! layer never assumes retries happen below it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod settings;

pub use client::{ChatClient, Credentials, RecoveryKey, RoomId, RoomSummary, SessionInfo};
pub use error::ClientError;
pub use settings::{AppSettings, SettingsStore};
