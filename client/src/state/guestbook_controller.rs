//! Guestbook lifecycle: live subscription and posting.
//!
//! LIFECYCLE
//! =========
//! 1. `attach` opens one live query (newest 20 by timestamp). Repeated calls
//!    while attached do nothing.
//! 2. Every batch is applied atomically to the state cell.
//! 3. `detach` cancels the query exactly once. Batches still in transit for
//!    an old attachment are dropped by a generation check.
//!
//! Posting clears the text input before the store answers; the message shows
//! up only once the feed reports it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use frames::feed::{ChangeBatch, DEFAULT_FEED_LIMIT, FeedQuery};
use futures::FutureExt;
use futures::future::LocalBoxFuture;

use super::cell::StateCell;
use super::guestbook::GuestbookState;
use super::subscription::Subscription;
use crate::net::store::MessageStore;

#[cfg(test)]
#[path = "guestbook_controller_test.rs"]
mod guestbook_controller_test;

pub struct GuestbookController {
    state: StateCell<GuestbookState>,
    store: Rc<dyn MessageStore>,
    subscription: RefCell<Option<Subscription>>,
    generation: Rc<Cell<u64>>,
}

impl GuestbookController {
    pub fn new(store: Rc<dyn MessageStore>) -> Self {
        Self {
            state: StateCell::new(GuestbookState::default()),
            store,
            subscription: RefCell::new(None),
            generation: Rc::new(Cell::new(0)),
        }
    }

    #[must_use]
    pub fn state(&self) -> &StateCell<GuestbookState> {
        &self.state
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    /// Open the live query if it is not open yet.
    pub fn attach(&self) {
        if self.is_attached() {
            return;
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let state = self.state.clone();
        let current = Rc::clone(&self.generation);
        let on_batch = Box::new(move |batch: ChangeBatch| {
            if current.get() != generation {
                return;
            }
            state.update(|s| s.apply_batch(&batch));
        });

        let subscription = self.store.subscribe(FeedQuery::recent_messages(DEFAULT_FEED_LIMIT), on_batch);
        *self.subscription.borrow_mut() = Some(subscription);
    }

    /// Close the live query. Safe to call when not attached.
    pub fn detach(&self) {
        self.generation.set(self.generation.get() + 1);
        let subscription = self.subscription.borrow_mut().take();
        if let Some(mut subscription) = subscription {
            subscription.cancel();
        }
    }

    pub fn set_name(&self, name: String) {
        self.state.update(|s| s.draft.name = name);
    }

    pub fn set_text(&self, text: String) {
        self.state.update(|s| s.draft.text = text);
    }

    /// Submit the draft at `now_ms`.
    ///
    /// Returns `None` when the text is blank. Otherwise the text input is
    /// already cleared and the returned future records the store's answer.
    pub fn submit(&self, now_ms: i64) -> Option<LocalBoxFuture<'static, ()>> {
        let message = self.state.update(|s| s.take_submission(now_ms))?;
        let request = self.store.create(message);
        let state = self.state.clone();

        Some(
            async move {
                let result = request.await;
                if let Err(e) = &result {
                    leptos::logging::warn!("guestbook: post failed: {e}");
                }
                state.update(|s| s.finish_post(result.map_err(|e| e.to_string())));
            }
            .boxed_local(),
        )
    }
}

impl Drop for GuestbookController {
    fn drop(&mut self) {
        self.detach();
    }
}
