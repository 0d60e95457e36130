//! Generic state machine engine for Confab's application flows.
//!
//! Every multi-screen flow in Confab (authentication, the user session,
//! secure backup setup) owns one [`Machine`] instance and drives it with a
//! closed set of events. The machine holds the flow's current state and a
//! table of declaratively-configured routes; feeding it an event either
//! commits exactly one transition or rejects the event, leaving state
//! untouched.
//!
//! # Components
//!
//! - [`MachineState`] / [`MachineEvent`]: traits giving each enum variant a
//!   comparable `Kind` discriminant, so routes match on variants without
//!   comparing payloads
//! - [`Route`]: a `(from pattern, event pattern, guard?) -> target`
//!   declaration, configured once at build time
//! - [`MachineBuilder`]: validates the route table and rejects ambiguous
//!   configurations before a machine exists
//! - [`Machine`]: evaluates events, commits transitions atomically, and runs
//!   registered handlers in registration order
//!
//! Handlers never re-enter the machine. Follow-up events they enqueue are
//! returned to the caller in [`Transition::followups`]; the owning flow
//! coordinator drains them one at a time, preserving strict event ordering.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod builder;
mod error;
mod machine;
mod route;

pub use builder::MachineBuilder;
pub use error::BuildError;
pub use machine::{Commit, Enqueue, HandlerPattern, Machine, Rejected, Transition};
pub use route::{MachineEvent, MachineState, Pattern, Route};
