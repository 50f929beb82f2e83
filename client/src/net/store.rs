//! The message store seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guestbook never talks to a socket directly. It opens live queries and
//! posts messages through `MessageStore`; the browser build plugs in the
//! WebSocket-backed store, server rendering plugs in `OfflineStore`, and
//! tests use an in-memory fake.

use frames::feed::{ChangeBatch, FeedQuery, NewMessage};
use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::state::subscription::Subscription;

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

/// Why a store operation did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not connected to the message store")]
    Disconnected,
    #[error("message store unavailable")]
    Unavailable,
    #[error("{message} ({code})")]
    Rejected { code: String, message: String, retryable: bool },
}

impl StoreError {
    /// Whether repeating the same request could succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Disconnected => true,
            Self::Unavailable => false,
            Self::Rejected { retryable, .. } => *retryable,
        }
    }
}

/// Callback receiving every change batch of a live query, in order.
pub type BatchListener = Box<dyn Fn(ChangeBatch)>;

/// A document store with ordered, limited live queries.
pub trait MessageStore {
    /// Open a live query. The first batch delivered is a snapshot. Batches
    /// stop when the returned handle is cancelled or dropped.
    fn subscribe(&self, query: FeedQuery, on_batch: BatchListener) -> Subscription;

    /// Create a message. Resolves once the store accepted or rejected it.
    fn create(&self, message: NewMessage) -> LocalBoxFuture<'static, Result<(), StoreError>>;
}

/// Store used where no live connection exists (server-side rendering).
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineStore;

impl MessageStore for OfflineStore {
    fn subscribe(&self, _query: FeedQuery, _on_batch: BatchListener) -> Subscription {
        Subscription::noop()
    }

    fn create(&self, _message: NewMessage) -> LocalBoxFuture<'static, Result<(), StoreError>> {
        futures::future::ready(Err(StoreError::Unavailable)).boxed_local()
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    pub struct FakeInner {
        pub queries: Vec<FeedQuery>,
        pub live: Vec<(u64, Rc<dyn Fn(ChangeBatch)>)>,
        /// Every listener ever registered, cancelled or not.
        pub all: Vec<Rc<dyn Fn(ChangeBatch)>>,
        pub cancels: usize,
        pub created: Vec<NewMessage>,
        pub fail_create: Option<StoreError>,
        next_id: u64,
    }

    /// Scriptable in-memory store.
    #[derive(Clone, Default)]
    pub struct FakeStore {
        pub inner: Rc<RefCell<FakeInner>>,
    }

    impl FakeStore {
        /// Deliver a batch to every live query.
        pub fn deliver(&self, batch: &ChangeBatch) {
            let live: Vec<_> = self.inner.borrow().live.iter().map(|(_, l)| Rc::clone(l)).collect();
            for listener in live {
                listener(batch.clone());
            }
        }

        /// Deliver a batch even to cancelled listeners, as a batch already
        /// in transit when the query was cancelled would be.
        pub fn deliver_late(&self, batch: &ChangeBatch) {
            let all: Vec<_> = self.inner.borrow().all.clone();
            for listener in all {
                listener(batch.clone());
            }
        }

        pub fn live_count(&self) -> usize {
            self.inner.borrow().live.len()
        }

        pub fn cancels(&self) -> usize {
            self.inner.borrow().cancels
        }

        pub fn created(&self) -> Vec<NewMessage> {
            self.inner.borrow().created.clone()
        }
    }

    impl MessageStore for FakeStore {
        fn subscribe(&self, query: FeedQuery, on_batch: BatchListener) -> Subscription {
            let listener: Rc<dyn Fn(ChangeBatch)> = Rc::from(on_batch);
            let id = {
                let mut inner = self.inner.borrow_mut();
                let id = inner.next_id;
                inner.next_id += 1;
                inner.queries.push(query);
                inner.live.push((id, Rc::clone(&listener)));
                inner.all.push(listener);
                id
            };
            let inner = Rc::clone(&self.inner);
            Subscription::new(move || {
                let mut inner = inner.borrow_mut();
                inner.cancels += 1;
                inner.live.retain(|(lid, _)| *lid != id);
            })
        }

        fn create(&self, message: NewMessage) -> LocalBoxFuture<'static, Result<(), StoreError>> {
            let mut inner = self.inner.borrow_mut();
            inner.created.push(message);
            let result = match &inner.fail_create {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            };
            futures::future::ready(result).boxed_local()
        }
    }
}
