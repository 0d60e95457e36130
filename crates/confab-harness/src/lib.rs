//! Deterministic test doubles for Confab's flow layer.
//!
//! Everything here implements the same contracts production code runs
//! against, so coordinator tests exercise the real flows end to end:
//!
//! - [`ScriptedClient`]: a [`ChatClient`](confab_session::ChatClient) whose
//!   results are queued ahead of time, with a pause gate for tests that need
//!   an operation to resolve *after* something else happened
//! - [`MemorySettings`]: an in-memory settings store
//! - [`RecordingPresenter`]: captures every navigation change as a list of
//!   screen kinds
//! - [`settle`]: drains the flow channel and lets spawned SDK calls land

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod drive;
mod presenter;
mod settings;

pub use client::ScriptedClient;
pub use drive::settle;
pub use presenter::{PresentedScreens, RecordingPresenter};
pub use settings::MemorySettings;
