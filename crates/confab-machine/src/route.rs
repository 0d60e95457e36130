//! Route declarations: patterns, guards, and targets.
//!
//! A route is a static declaration made at machine-build time. Routes are
//! matched in declaration order; the first route whose patterns match, whose
//! guard passes, and whose target resolves wins.

use std::fmt;
use std::hash::Hash;

/// A state held by a [`Machine`](crate::Machine).
///
/// States are enum variants, optionally carrying payloads (a selected room
/// ID, a sign-out mode). Routes match on the payload-free [`Kind`]
/// discriminant; guards and mapping targets see the full value.
///
/// [`Kind`]: MachineState::Kind
pub trait MachineState: Clone + fmt::Debug + Send + 'static {
    /// Payload-free discriminant identifying the variant.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send;

    /// The discriminant of this value.
    fn kind(&self) -> Self::Kind;
}

/// An event fed to a [`Machine`](crate::Machine).
///
/// Events are transient: the machine consumes them on arrival and never
/// stores them. Deep-link activations and organic user actions produce the
/// same event type; the machine cannot tell them apart.
pub trait MachineEvent: fmt::Debug + Send + 'static {
    /// Payload-free discriminant identifying the variant.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send;

    /// The discriminant of this value.
    fn kind(&self) -> Self::Kind;
}

/// Matches a state or event kind, or any kind at all.
///
/// `Any` enables cross-cutting routes and handlers (log every transition,
/// accept a sign-out from anywhere) without enumerating every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<K> {
    /// Matches every kind.
    Any,
    /// Matches exactly one kind.
    Is(K),
}

impl<K: Copy + Eq + fmt::Debug> Pattern<K> {
    /// Whether this pattern matches the given kind.
    pub fn matches(self, kind: K) -> bool {
        match self {
            Self::Any => true,
            Self::Is(k) => k == kind,
        }
    }

    pub(crate) fn describe(self) -> String {
        match self {
            Self::Any => "any".to_owned(),
            Self::Is(k) => format!("{k:?}"),
        }
    }
}

impl<K> From<K> for Pattern<K> {
    fn from(kind: K) -> Self {
        Self::Is(kind)
    }
}

/// Guard predicate: the transition is eligible only if this holds.
pub(crate) type Guard<S, E> = Box<dyn Fn(&S, &E) -> bool + Send>;

/// Where a route leads.
pub(crate) enum Target<S, E> {
    /// A fixed target state.
    Fixed(S),
    /// A target computed from the current state and the event payload.
    /// Returning `None` declines the route and evaluation continues.
    Map(Box<dyn Fn(&S, &E) -> Option<S> + Send>),
}

/// A single `(from pattern, event pattern, guard?) -> target` declaration.
///
/// Immutable once the machine is built.
pub struct Route<S: MachineState, E: MachineEvent> {
    pub(crate) from: Pattern<S::Kind>,
    pub(crate) on: Pattern<E::Kind>,
    pub(crate) guard: Option<Guard<S, E>>,
    pub(crate) target: Target<S, E>,
}

impl<S: MachineState, E: MachineEvent> Route<S, E> {
    /// A route to a fixed target state.
    pub fn new(
        from: impl Into<Pattern<S::Kind>>,
        on: impl Into<Pattern<E::Kind>>,
        to: S,
    ) -> Self {
        Self { from: from.into(), on: on.into(), guard: None, target: Target::Fixed(to) }
    }

    /// A route whose target is computed from the current state and the event,
    /// for targets that carry payloads out of either. Returning `None`
    /// declines the route.
    pub fn map(
        from: impl Into<Pattern<S::Kind>>,
        on: impl Into<Pattern<E::Kind>>,
        map: impl Fn(&S, &E) -> Option<S> + Send + 'static,
    ) -> Self {
        Self { from: from.into(), on: on.into(), guard: None, target: Target::Map(Box::new(map)) }
    }

    /// Attach a guard predicate. The route only fires when it returns true.
    pub fn when(mut self, guard: impl Fn(&S, &E) -> bool + Send + 'static) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Whether this route can be checked for conflicts statically: a fixed
    /// target and no guard means matching is decided by patterns alone.
    pub(crate) fn is_static(&self) -> bool {
        self.guard.is_none() && matches!(self.target, Target::Fixed(_))
    }
}

impl<S: MachineState, E: MachineEvent> fmt::Debug for Route<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("from", &self.from)
            .field("on", &self.on)
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}
