//! In-memory settings store double.

use confab_session::{AppSettings, SettingsStore};
use tokio::sync::watch;

/// A [`SettingsStore`] backed by nothing but a watch channel.
#[derive(Debug)]
pub struct MemorySettings {
    values: watch::Sender<AppSettings>,
}

impl MemorySettings {
    /// A store holding the default settings.
    pub fn new() -> Self {
        Self::with(AppSettings::default())
    }

    /// A store holding the given settings.
    pub fn with(settings: AppSettings) -> Self {
        Self { values: watch::Sender::new(settings) }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettings {
    fn settings(&self) -> AppSettings {
        self.values.borrow().clone()
    }

    fn replace(&self, settings: AppSettings) {
        self.values.send_replace(settings);
    }

    fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.values.subscribe()
    }
}
