//! Build-time configuration errors.

use thiserror::Error;

/// Errors detected while validating a route table.
///
/// These are programming errors in a flow's transition table, not runtime
/// conditions: a machine that builds successfully never produces them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Two guardless fixed-target routes match the same (state, event) pair.
    /// Which one fires would be decided by declaration order alone, which is
    /// almost certainly a mistake in the table.
    #[error("ambiguous routes: more than one guardless route matches state {from} on event {on}")]
    AmbiguousRoute {
        /// State pattern both routes share.
        from: String,
        /// Event pattern both routes share.
        on: String,
    },
}
