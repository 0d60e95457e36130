//! The machine itself: event evaluation, commit, and handlers.

use std::fmt;

use thiserror::Error;

use crate::route::{MachineEvent, MachineState, Pattern, Route, Target};

/// A committed transition, returned by [`Machine::try_event`].
#[derive(Debug)]
pub struct Transition<S, E> {
    /// State before the transition.
    pub from: S,
    /// The event that fired it.
    pub event: E,
    /// State after the transition.
    pub to: S,
    /// Events enqueued by handlers during this commit, in enqueue order.
    /// The owner must feed these back one at a time; the machine never
    /// evaluates them itself.
    pub followups: Vec<E>,
}

/// No route matched: the machine's state is unchanged and the event is
/// returned to the caller.
///
/// Rejection is not fatal. Callers decide whether an unmatched event is a
/// programming error or an expected no-op such as a duplicate cancellation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no route from {state:?} accepts {event:?}")]
pub struct Rejected<S: fmt::Debug, E: fmt::Debug> {
    /// State the machine was (and still is) in.
    pub state: S,
    /// The rejected event, returned for reuse.
    pub event: E,
}

/// The committed `(from, event, to)` triple, as seen by handlers.
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a, S, E> {
    /// State before the transition.
    pub from: &'a S,
    /// The event that fired it.
    pub event: &'a E,
    /// State after the transition.
    pub to: &'a S,
}

/// Sink handlers use to enqueue follow-up events.
///
/// Pushed events are collected into [`Transition::followups`] after every
/// matching handler has returned; nothing is evaluated mid-commit.
pub struct Enqueue<'a, E> {
    events: &'a mut Vec<E>,
}

impl<E> Enqueue<'_, E> {
    /// Enqueue an event for the owner to process after this commit.
    pub fn push(&mut self, event: E) {
        self.events.push(event);
    }
}

/// Selects which commits a handler observes. Defaults to every commit.
#[derive(Debug, Clone, Copy)]
pub struct HandlerPattern<SK, EK> {
    from: Pattern<SK>,
    on: Pattern<EK>,
    to: Pattern<SK>,
}

impl<SK: Copy + Eq + fmt::Debug, EK: Copy + Eq + fmt::Debug> HandlerPattern<SK, EK> {
    /// Matches every commit.
    pub fn any() -> Self {
        Self { from: Pattern::Any, on: Pattern::Any, to: Pattern::Any }
    }

    /// Restrict to commits leaving the given state kind.
    #[must_use]
    pub fn from_state(mut self, kind: SK) -> Self {
        self.from = Pattern::Is(kind);
        self
    }

    /// Restrict to commits fired by the given event kind.
    #[must_use]
    pub fn on_event(mut self, kind: EK) -> Self {
        self.on = Pattern::Is(kind);
        self
    }

    /// Restrict to commits entering the given state kind.
    #[must_use]
    pub fn to_state(mut self, kind: SK) -> Self {
        self.to = Pattern::Is(kind);
        self
    }

    fn matches(&self, from: SK, on: EK, to: SK) -> bool {
        self.from.matches(from) && self.on.matches(on) && self.to.matches(to)
    }
}

type HandlerFn<S, E> = Box<dyn FnMut(Commit<'_, S, E>, &mut Enqueue<'_, E>) + Send>;

struct Handler<S: MachineState, E: MachineEvent> {
    pattern: HandlerPattern<S::Kind, E::Kind>,
    callback: HandlerFn<S, E>,
}

/// A flow's state machine: one current state, an immutable route table, and
/// an ordered list of transition handlers.
///
/// Not designed for concurrent use; a flow coordinator owns its machine
/// exclusively and feeds it events from a single logical task.
pub struct Machine<S: MachineState, E: MachineEvent> {
    state: S,
    routes: Vec<Route<S, E>>,
    handlers: Vec<Handler<S, E>>,
}

impl<S: MachineState, E: MachineEvent> Machine<S, E> {
    pub(crate) fn new(initial: S, routes: Vec<Route<S, E>>) -> Self {
        Self { state: initial, routes, handlers: Vec::new() }
    }

    /// The current state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Register a handler invoked after each matching commit, in
    /// registration order. Handlers observe the committed triple and may
    /// enqueue follow-up events; they cannot re-enter the machine.
    pub fn on_transition(
        &mut self,
        pattern: HandlerPattern<S::Kind, E::Kind>,
        callback: impl FnMut(Commit<'_, S, E>, &mut Enqueue<'_, E>) + Send + 'static,
    ) {
        self.handlers.push(Handler { pattern, callback: Box::new(callback) });
    }

    /// Evaluate one event against the route table.
    ///
    /// Routes are tried in declaration order; the first whose state pattern
    /// matches the current state, whose event pattern matches the event,
    /// whose guard passes, and whose target resolves is applied. The commit
    /// is atomic: the state is replaced and every matching handler runs
    /// before this returns.
    ///
    /// # Errors
    ///
    /// [`Rejected`] when no route matched. State is untouched and the event
    /// is handed back.
    pub fn try_event(&mut self, event: E) -> Result<Transition<S, E>, Rejected<S, E>> {
        let Some(to) = self.resolve(&event) else {
            tracing::debug!(state = ?self.state, event = ?event, "event rejected");
            return Err(Rejected { state: self.state.clone(), event });
        };

        let from = std::mem::replace(&mut self.state, to);
        tracing::debug!(from = ?from, to = ?self.state, event = ?event, "transition committed");

        let mut followups = Vec::new();
        let (from_kind, on_kind, to_kind) = (from.kind(), event.kind(), self.state.kind());
        for handler in &mut self.handlers {
            if handler.pattern.matches(from_kind, on_kind, to_kind) {
                let commit = Commit { from: &from, event: &event, to: &self.state };
                (handler.callback)(commit, &mut Enqueue { events: &mut followups });
            }
        }

        Ok(Transition { from, event, to: self.state.clone(), followups })
    }

    fn resolve(&self, event: &E) -> Option<S> {
        let state_kind = self.state.kind();
        let event_kind = event.kind();

        for route in &self.routes {
            if !route.from.matches(state_kind) || !route.on.matches(event_kind) {
                continue;
            }
            if let Some(guard) = &route.guard
                && !guard(&self.state, event)
            {
                continue;
            }
            match &route.target {
                Target::Fixed(to) => return Some(to.clone()),
                Target::Map(map) => {
                    if let Some(to) = map(&self.state, event) {
                        return Some(to);
                    }
                },
            }
        }

        None
    }
}

impl<S: MachineState, E: MachineEvent> fmt::Debug for Machine<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("routes", &self.routes.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::builder::MachineBuilder;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Auth {
        LoggedOut,
        Authenticating { attempt: u32 },
        LoggedIn,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum AuthKind {
        LoggedOut,
        Authenticating,
        LoggedIn,
    }

    impl MachineState for Auth {
        type Kind = AuthKind;

        fn kind(&self) -> AuthKind {
            match self {
                Self::LoggedOut => AuthKind::LoggedOut,
                Self::Authenticating { .. } => AuthKind::Authenticating,
                Self::LoggedIn => AuthKind::LoggedIn,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    #[allow(dead_code)]
    enum Ev {
        Submit { username: String },
        Succeeded,
        Failed,
        Logout,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum EvKind {
        Submit,
        Succeeded,
        Failed,
        Logout,
    }

    impl MachineEvent for Ev {
        type Kind = EvKind;

        fn kind(&self) -> EvKind {
            match self {
                Self::Submit { .. } => EvKind::Submit,
                Self::Succeeded => EvKind::Succeeded,
                Self::Failed => EvKind::Failed,
                Self::Logout => EvKind::Logout,
            }
        }
    }

    fn auth_machine() -> Machine<Auth, Ev> {
        MachineBuilder::new(Auth::LoggedOut)
            .route(
                Route::map(AuthKind::LoggedOut, EvKind::Submit, |_, event| {
                    let Ev::Submit { username } = event else { return None };
                    (!username.is_empty()).then_some(Auth::Authenticating { attempt: 1 })
                }),
            )
            .route(Route::new(AuthKind::Authenticating, EvKind::Succeeded, Auth::LoggedIn))
            .route(Route::new(AuthKind::Authenticating, EvKind::Failed, Auth::LoggedOut))
            .route(Route::new(AuthKind::LoggedIn, EvKind::Logout, Auth::LoggedOut))
            .build()
            .unwrap()
    }

    #[test]
    fn commit_replaces_state_and_reports_triple() {
        let mut machine = auth_machine();

        let transition =
            machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();

        assert_eq!(transition.from, Auth::LoggedOut);
        assert_eq!(transition.to, Auth::Authenticating { attempt: 1 });
        assert_eq!(machine.state(), &Auth::Authenticating { attempt: 1 });
    }

    #[test]
    fn rejection_leaves_state_unchanged_and_returns_event() {
        let mut machine = auth_machine();

        let rejected = machine.try_event(Ev::Succeeded).unwrap_err();

        assert_eq!(rejected.state, Auth::LoggedOut);
        assert_eq!(rejected.event, Ev::Succeeded);
        assert_eq!(machine.state(), &Auth::LoggedOut);
    }

    #[test]
    fn mapping_route_declines_on_empty_payload() {
        let mut machine = auth_machine();

        let rejected = machine.try_event(Ev::Submit { username: String::new() }).unwrap_err();

        assert_eq!(machine.state(), &Auth::LoggedOut);
        assert_eq!(rejected.event, Ev::Submit { username: String::new() });
    }

    #[test]
    fn round_trip_reenters_target_state() {
        let mut machine = auth_machine();

        machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();
        machine.try_event(Ev::Succeeded).unwrap();
        machine.try_event(Ev::Logout).unwrap();
        machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();
        let transition = machine.try_event(Ev::Succeeded).unwrap();

        assert_eq!(transition.to, Auth::LoggedIn);
        assert_eq!(machine.state(), &Auth::LoggedIn);
    }

    #[test]
    fn handlers_run_in_registration_order_exactly_once() {
        let mut machine = auth_machine();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        machine.on_transition(HandlerPattern::any(), move |_, _| {
            first.lock().unwrap().push("first");
        });
        let second = Arc::clone(&order);
        machine.on_transition(
            HandlerPattern::any().to_state(AuthKind::Authenticating),
            move |_, _| {
                second.lock().unwrap().push("second");
            },
        );

        machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn handler_pattern_filters_commits() {
        let mut machine = auth_machine();
        let seen = Arc::new(Mutex::new(0_u32));

        let counter = Arc::clone(&seen);
        machine.on_transition(
            HandlerPattern::any().to_state(AuthKind::LoggedIn),
            move |commit, _| {
                assert_eq!(commit.to.kind(), AuthKind::LoggedIn);
                *counter.lock().unwrap() += 1;
            },
        );

        machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();
        assert_eq!(*seen.lock().unwrap(), 0);

        machine.try_event(Ev::Succeeded).unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn handler_followups_are_returned_not_evaluated() {
        let mut machine = auth_machine();

        machine.on_transition(
            HandlerPattern::any().to_state(AuthKind::LoggedIn),
            |_, queue| queue.push(Ev::Logout),
        );

        machine.try_event(Ev::Submit { username: "alice".into() }).unwrap();
        let transition = machine.try_event(Ev::Succeeded).unwrap();

        // The follow-up is reported, but the machine has not applied it.
        assert_eq!(transition.followups, vec![Ev::Logout]);
        assert_eq!(machine.state(), &Auth::LoggedIn);
    }

    #[test]
    fn guard_gates_route_eligibility() {
        let mut machine = MachineBuilder::new(Auth::LoggedOut)
            .route(
                Route::new(AuthKind::LoggedOut, EvKind::Succeeded, Auth::LoggedIn)
                    .when(|_, _| false),
            )
            .route(
                Route::new(
                    AuthKind::LoggedOut,
                    EvKind::Succeeded,
                    Auth::Authenticating { attempt: 0 },
                )
                .when(|_, _| true),
            )
            .build()
            .unwrap();

        let transition = machine.try_event(Ev::Succeeded).unwrap();

        // First route is ineligible; declaration order picks the second.
        assert_eq!(transition.to, Auth::Authenticating { attempt: 0 });
    }

    #[test]
    fn wildcard_route_catches_any_state() {
        let mut machine = MachineBuilder::new(Auth::LoggedIn)
            .route(Route::new(Pattern::Any, EvKind::Logout, Auth::LoggedOut))
            .build()
            .unwrap();

        machine.try_event(Ev::Logout).unwrap();
        assert_eq!(machine.state(), &Auth::LoggedOut);

        // Still routable from the state it just entered.
        machine.try_event(Ev::Logout).unwrap();
        assert_eq!(machine.state(), &Auth::LoggedOut);
    }
}
