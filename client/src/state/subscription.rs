//! Owned handle for any listener registration.
//!
//! Route listeners, state observers, and live feed queries all hand back a
//! `Subscription`. Its cancel action runs at most once: on an explicit
//! [`Subscription::cancel`] or when the handle is dropped.

#[cfg(test)]
#[path = "subscription_test.rs"]
mod subscription_test;

/// Cancels its registration exactly once.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Whether the cancel action has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}
