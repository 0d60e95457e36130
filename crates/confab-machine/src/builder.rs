//! Machine construction and route-table validation.

use crate::error::BuildError;
use crate::machine::Machine;
use crate::route::{MachineEvent, MachineState, Route};

/// Builds a [`Machine`] from an initial state and a route table.
///
/// Routes are evaluated in the order they are added. `build` validates the
/// table before any machine exists, so a conflicting configuration fails at
/// startup rather than on some rarely-hit transition.
pub struct MachineBuilder<S: MachineState, E: MachineEvent> {
    initial: S,
    routes: Vec<Route<S, E>>,
}

impl<S: MachineState, E: MachineEvent> MachineBuilder<S, E> {
    /// Start a builder with the machine's initial state.
    pub fn new(initial: S) -> Self {
        Self { initial, routes: Vec::new() }
    }

    /// Append a route. Declaration order is evaluation order.
    #[must_use]
    pub fn route(mut self, route: Route<S, E>) -> Self {
        self.routes.push(route);
        self
    }

    /// Append several routes at once.
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route<S, E>>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Validate the table and produce the machine.
    ///
    /// # Errors
    ///
    /// [`BuildError::AmbiguousRoute`] when two guardless fixed-target routes
    /// declare an identical (state, event) pattern pair. Guarded and mapping
    /// routes are exempt: their outcome depends on runtime values, and
    /// overlaps among them resolve first-match-wins in declaration order.
    pub fn build(self) -> Result<Machine<S, E>, BuildError> {
        for (i, a) in self.routes.iter().enumerate() {
            if !a.is_static() {
                continue;
            }
            for b in &self.routes[i + 1..] {
                if b.is_static() && a.from == b.from && a.on == b.on {
                    return Err(BuildError::AmbiguousRoute {
                        from: a.from.describe(),
                        on: a.on.describe(),
                    });
                }
            }
        }

        Ok(Machine::new(self.initial, self.routes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::Pattern;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Light {
        Red,
        Green,
    }

    impl MachineState for Light {
        type Kind = Self;

        fn kind(&self) -> Self {
            *self
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Pulse {
        Go,
        Stop,
    }

    impl MachineEvent for Pulse {
        type Kind = Self;

        fn kind(&self) -> Self {
            *self
        }
    }

    #[test]
    fn duplicate_guardless_routes_fail_to_build() {
        let result = MachineBuilder::<Light, Pulse>::new(Light::Red)
            .route(Route::new(Light::Red, Pulse::Go, Light::Green))
            .route(Route::new(Light::Red, Pulse::Go, Light::Red))
            .build();

        assert!(matches!(result, Err(BuildError::AmbiguousRoute { .. })));
    }

    #[test]
    fn guards_disambiguate_identical_patterns() {
        let result = MachineBuilder::<Light, Pulse>::new(Light::Red)
            .route(Route::new(Light::Red, Pulse::Go, Light::Green).when(|_, _| true))
            .route(Route::new(Light::Red, Pulse::Go, Light::Red))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn wildcard_and_concrete_patterns_may_coexist() {
        // (any, Stop) overlaps (Green, Stop) but is not identical to it;
        // declaration order decides, which is the documented contract.
        let result = MachineBuilder::<Light, Pulse>::new(Light::Green)
            .route(Route::new(Light::Green, Pulse::Stop, Light::Red))
            .route(Route::new(Pattern::Any, Pulse::Stop, Light::Red))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn mapping_routes_are_exempt_from_conflict_detection() {
        let result = MachineBuilder::<Light, Pulse>::new(Light::Red)
            .route(Route::map(Light::Red, Pulse::Go, |_, _| Some(Light::Green)))
            .route(Route::map(Light::Red, Pulse::Go, |_, _| None))
            .build();

        assert!(result.is_ok());
    }
}
