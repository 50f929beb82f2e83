//! Bookkeeping for one message store connection.
//!
//! Live queries outlive the socket: they are kept here by subscribe request
//! ID and re-issued under that ID whenever a new session starts. Create
//! requests wait here for their `done` or `error` reply.
//!
//! `Session` never touches the socket. Every method returns the frames the
//! caller must send, so the browser loop in `ws_store` stays thin.
//!
//! ERROR HANDLING
//! ==============
//! A failed subscribe keeps its query. Retryable failures are re-sent after
//! a delay; the rest wait for the next session. Creates are never retried:
//! losing the session fails them with [`StoreError::Disconnected`].

use std::collections::HashMap;
use std::rc::Rc;

use frames::Frame;
use frames::feed::{ChangeBatch, FeedQuery, NewMessage};
use futures::channel::oneshot;

use super::feed_frames::{Inbound, cancel_frame, classify, create_frame, subscribe_frame};
use super::store::{BatchListener, StoreError};

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Resolves a pending create.
pub type CreateReply = oneshot::Receiver<Result<(), StoreError>>;

struct LiveQuery {
    query: FeedQuery,
    on_batch: Rc<dyn Fn(ChangeBatch)>,
}

/// What the connection loop must do after an inbound frame.
pub enum Reaction {
    Nothing,
    /// Send these frames, in order.
    Send(Vec<Frame>),
    /// Hand the batch to the query's listener. The caller invokes it after
    /// releasing its borrow of the session.
    Deliver(Rc<dyn Fn(ChangeBatch)>, ChangeBatch),
    /// Re-send the subscribe for this query after a delay.
    RetryLater(String),
}

#[derive(Default)]
pub struct Session {
    connected: bool,
    queries: HashMap<String, LiveQuery>,
    pending: HashMap<String, oneshot::Sender<Result<(), StoreError>>>,
}

impl Session {
    #[cfg(test)]
    pub fn has_query(&self, id: &str) -> bool {
        self.queries.contains_key(id)
    }

    /// Register a live query. Returns its subscribe frame when a session is
    /// up; otherwise the query goes out once one starts.
    pub fn open(&mut self, id: &str, query: FeedQuery, on_batch: BatchListener) -> Option<Frame> {
        let frame = self.connected.then(|| subscribe_frame(id, &query));
        self.queries
            .insert(id.to_owned(), LiveQuery { query, on_batch: Rc::from(on_batch) });
        frame
    }

    /// Forget a live query. Returns the cancel frame when the server knows
    /// about it.
    pub fn close(&mut self, id: &str) -> Option<Frame> {
        let removed = self.queries.remove(id).is_some();
        (removed && self.connected).then(|| cancel_frame(id))
    }

    /// Start a create request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] when no session is up.
    pub fn begin_create(&mut self, id: &str, message: &NewMessage) -> Result<(Frame, CreateReply), StoreError> {
        if !self.connected {
            return Err(StoreError::Disconnected);
        }
        let (waiter, reply) = oneshot::channel();
        self.pending.insert(id.to_owned(), waiter);
        Ok((create_frame(id, message), reply))
    }

    /// Drop a create whose frame could not be queued.
    pub fn abandon_create(&mut self, id: &str) {
        self.pending.remove(id);
    }

    /// The subscribe frame for a retry, if the query is still open and a
    /// session is up.
    #[must_use]
    pub fn retry(&self, id: &str) -> Option<Frame> {
        if !self.connected {
            return None;
        }
        self.queries.get(id).map(|live| subscribe_frame(id, &live.query))
    }

    pub fn receive(&mut self, frame: &Frame) -> Reaction {
        match classify(frame) {
            Inbound::Connected => {
                self.connected = true;
                let outgoing: Vec<Frame> = self
                    .queries
                    .iter()
                    .map(|(id, live)| subscribe_frame(id, &live.query))
                    .collect();
                leptos::logging::log!("feed: session connected, re-issuing {} queries", outgoing.len());
                Reaction::Send(outgoing)
            }
            Inbound::Batch { subscription, batch } => match self.queries.get(&subscription) {
                Some(live) => Reaction::Deliver(Rc::clone(&live.on_batch), batch),
                None => Reaction::Nothing,
            },
            Inbound::Closed { subscription } => {
                self.queries.remove(&subscription);
                Reaction::Nothing
            }
            Inbound::Created { request } => {
                self.resolve(&request, Ok(()));
                Reaction::Nothing
            }
            Inbound::Failed { request, error } if self.queries.contains_key(&request) => {
                leptos::logging::warn!("feed: subscription {request} failed: {error}");
                if error.retryable() {
                    Reaction::RetryLater(request)
                } else {
                    Reaction::Nothing
                }
            }
            Inbound::Failed { request, error } => {
                self.resolve(&request, Err(error));
                Reaction::Nothing
            }
            Inbound::GatewayError(message) => {
                leptos::logging::warn!("feed: gateway error: {message}");
                Reaction::Nothing
            }
            Inbound::Ignored => Reaction::Nothing,
        }
    }

    /// Mark the session gone and fail every create in flight. Returns whether
    /// a session had been established.
    pub fn disconnected(&mut self) -> bool {
        let was_connected = std::mem::replace(&mut self.connected, false);
        for (request, waiter) in self.pending.drain() {
            if waiter.send(Err(StoreError::Disconnected)).is_err() {
                leptos::logging::log!("feed: create {request} lost its caller");
            }
        }
        was_connected
    }

    fn resolve(&mut self, request: &str, result: Result<(), StoreError>) {
        let Some(waiter) = self.pending.remove(request) else {
            return;
        };
        if waiter.send(result).is_err() {
            leptos::logging::log!("feed: create {request} finished after its caller left");
        }
    }
}
