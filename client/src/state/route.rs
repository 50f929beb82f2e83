//! Route signals and the source that publishes them.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components that only need to know which page is active (the navbar) do
//! not reach for the router directly. They are handed a `RouteSource` and
//! observe it; the app feeds a `RouteHub` from the router's location.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::subscription::Subscription;

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

/// Component name of the landing page, served at `/`.
pub const DEFAULT_COMPONENT: &str = "explore";

/// The route part of a location change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Name of the page component the route renders.
    pub component: String,
}

/// Payload published on every location change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSignal {
    pub route: RouteInfo,
}

impl RouteSignal {
    pub fn new(component: impl Into<String>) -> Self {
        Self { route: RouteInfo { component: component.into() } }
    }

    /// Derive the signal for a URL path: the first path segment names the
    /// component, and the root path is the landing page.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        let segment = path.trim_start_matches('/').split(['/', '?', '#']).next().unwrap_or_default();
        if segment.is_empty() {
            Self::new(DEFAULT_COMPONENT)
        } else {
            Self::new(segment)
        }
    }
}

/// Anything that publishes route signals.
pub trait RouteSource {
    /// The last published signal, if any.
    fn current(&self) -> Option<RouteSignal>;

    /// Listen for future signals until the returned handle is dropped.
    fn subscribe(&self, listener: Box<dyn Fn(&RouteSignal)>) -> Subscription;
}

type Listener = Rc<dyn Fn(&RouteSignal)>;

#[derive(Default)]
struct HubInner {
    last: Option<RouteSignal>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// In-process route source. Cloning shares the same listeners.
#[derive(Clone, Default)]
pub struct RouteHub {
    inner: Rc<RefCell<HubInner>>,
}

impl RouteHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal and deliver it to every listener.
    pub fn publish(&self, signal: RouteSignal) {
        let listeners: Vec<Listener> = {
            let mut inner = self.inner.borrow_mut();
            if inner.last.as_ref() == Some(&signal) {
                return;
            }
            inner.last = Some(signal.clone());
            inner.listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
        };
        for listener in listeners {
            listener(&signal);
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl RouteSource for RouteHub {
    fn current(&self) -> Option<RouteSignal> {
        self.inner.borrow().last.clone()
    }

    fn subscribe(&self, listener: Box<dyn Fn(&RouteSignal)>) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::from(listener)));
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}
