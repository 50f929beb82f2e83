//! Navigation bar state: the mobile menu toggle and the active route.
//!
//! `burger_open` changes only on an explicit burger click; navigating does
//! not close the menu. `active_route` changes only when the route source
//! publishes a signal.

use super::cell::StateCell;
use super::route::{DEFAULT_COMPONENT, RouteSignal, RouteSource};
use super::subscription::Subscription;

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

/// External repository link shown at the end of the menu.
pub const SOURCE_URL: &str = "https://github.com/dtcristo/mandelbrot";

/// One entry of the navigation menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    /// Component name the entry highlights for.
    pub component: &'static str,
    pub label: &'static str,
    pub href: &'static str,
    /// Icon class, e.g. `"fas fa-compass"`.
    pub icon: &'static str,
    /// Icon color modifier.
    pub tone: &'static str,
}

pub const MENU: [MenuEntry; 4] = [
    MenuEntry { component: "explore", label: "Explore", href: "/explore", icon: "fas fa-compass", tone: "has-text-primary" },
    MenuEntry { component: "gallery", label: "Gallery", href: "/gallery", icon: "fas fa-star", tone: "has-text-warning" },
    MenuEntry { component: "about", label: "About", href: "/about", icon: "fas fa-info", tone: "has-text-info" },
    MenuEntry { component: "guestbook", label: "Guestbook", href: "/guestbook", icon: "fas fa-book", tone: "has-text-danger" },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavState {
    pub burger_open: bool,
    pub active_route: String,
}

impl Default for NavState {
    fn default() -> Self {
        Self { burger_open: false, active_route: DEFAULT_COMPONENT.to_owned() }
    }
}

impl NavState {
    pub fn toggle_burger(&mut self) {
        self.burger_open = !self.burger_open;
    }

    pub fn on_route(&mut self, signal: &RouteSignal) {
        self.active_route.clone_from(&signal.route.component);
    }

    /// Exact match on the component name; unknown routes highlight nothing.
    #[must_use]
    pub fn is_active(&self, component: &str) -> bool {
        self.active_route == component
    }

    #[must_use]
    pub fn burger_class(&self) -> &'static str {
        if self.burger_open { "navbar-burger is-active" } else { "navbar-burger" }
    }

    #[must_use]
    pub fn menu_class(&self) -> &'static str {
        if self.burger_open { "navbar-menu is-active" } else { "navbar-menu" }
    }

    /// Item classes: tab styling only while the mobile menu is closed.
    #[must_use]
    pub fn item_class(&self, component: &str) -> String {
        let mut class = String::from("navbar-item");
        if !self.burger_open {
            class.push_str(" is-tab");
        }
        if self.is_active(component) {
            class.push_str(" is-active");
        }
        class
    }

    #[must_use]
    pub fn aria_expanded(&self) -> &'static str {
        if self.burger_open { "true" } else { "false" }
    }
}

/// Owns the navbar state and its route subscription.
pub struct NavController {
    state: StateCell<NavState>,
    _route: Subscription,
}

impl NavController {
    /// Start from the source's current signal, then follow it.
    pub fn new(source: &dyn RouteSource) -> Self {
        let mut initial = NavState::default();
        if let Some(signal) = source.current() {
            initial.on_route(&signal);
        }
        let state = StateCell::new(initial);

        let follower = state.clone();
        let route = source.subscribe(Box::new(move |signal| follower.update(|s| s.on_route(signal))));

        Self { state, _route: route }
    }

    #[must_use]
    pub fn state(&self) -> &StateCell<NavState> {
        &self.state
    }

    pub fn toggle_burger(&self) {
        self.state.update(NavState::toggle_burger);
    }
}
