//! Navigation targets and the router seam.

use std::fmt;
use std::sync::Mutex;

use tracing::debug;

/// The application's routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Signed-in landing page.
    Dashboard,
    /// Sign-in form.
    Login,
    /// Sign-up form.
    SignUp,
}

impl Route {
    /// URL path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Login => "/login",
            Self::SignUp => "/signup",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Moves the user between routes.
pub trait Navigator: Send + Sync {
    /// Go to `route`.
    fn push(&self, route: Route);

    /// Re-read server-derived state for the current route.
    fn refresh(&self);
}

/// Navigator for the CLI, where a route change is only a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn push(&self, route: Route) {
        debug!("Navigate to {}", route);
    }

    fn refresh(&self) {
        debug!("Refresh");
    }
}

/// A navigation step recorded by [`MemoryNavigator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    /// `push(route)`.
    Push(Route),
    /// `refresh()`.
    Refresh,
}

/// Navigator that records every step, for inspection.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    steps: Mutex<Vec<NavStep>>,
}

impl MemoryNavigator {
    /// Create an empty navigator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step so far, oldest first.
    #[must_use]
    pub fn steps(&self) -> Vec<NavStep> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The most recently pushed route.
    #[must_use]
    pub fn current(&self) -> Option<Route> {
        self.steps().into_iter().rev().find_map(|step| match step {
            NavStep::Push(route) => Some(route),
            NavStep::Refresh => None,
        })
    }

    fn record(&self, step: NavStep) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(step);
        }
    }
}

impl Navigator for MemoryNavigator {
    fn push(&self, route: Route) {
        self.record(NavStep::Push(route));
    }

    fn refresh(&self) {
        self.record(NavStep::Refresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Dashboard.path(), "/dashboard");
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::SignUp.path(), "/signup");
    }

    #[test]
    fn test_memory_navigator_records() {
        let nav = MemoryNavigator::new();
        assert!(nav.current().is_none());

        nav.push(Route::Login);
        nav.push(Route::Dashboard);
        nav.refresh();

        assert_eq!(nav.current(), Some(Route::Dashboard));
        assert_eq!(
            nav.steps(),
            vec![
                NavStep::Push(Route::Login),
                NavStep::Push(Route::Dashboard),
                NavStep::Refresh
            ]
        );
    }
}
