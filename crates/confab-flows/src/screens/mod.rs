//! Screen view models.
//!
//! One module per screen, each defining its state value, its view actions,
//! its explicitly bindable sub-state, and the actions it emits back to the
//! owning flow coordinator.

pub mod backup_screen;
pub mod login_screen;
pub mod room_list;
pub mod settings_screen;
