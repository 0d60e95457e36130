//! The persisted-settings contract.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// User-tweakable application settings.
///
/// The value type that crosses the persistence boundary; storage itself is
/// an external collaborator behind [`SettingsStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Whether push notifications are delivered.
    pub notifications_enabled: bool,
    /// Whether anonymous analytics are reported.
    pub analytics_enabled: bool,
    /// Extra diagnostics surfaces for development builds.
    pub developer_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { notifications_enabled: true, analytics_enabled: false, developer_mode: false }
    }
}

/// Persisted settings storage as the flow layer sees it.
///
/// Reads and writes are cheap and synchronous; durability is the
/// implementation's concern. `subscribe` surfaces changes made anywhere —
/// including other parts of the process — so screens can observe settings
/// they did not change themselves.
pub trait SettingsStore: Send + Sync {
    /// Current settings snapshot.
    fn settings(&self) -> AppSettings;

    /// Replace the persisted settings.
    fn replace(&self, settings: AppSettings);

    /// Push-style updates for every subsequent change.
    fn subscribe(&self) -> watch::Receiver<AppSettings>;
}
