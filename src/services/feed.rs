//! Feed service: live, windowed subscriptions over the message collection.
//!
//! DESIGN
//! ======
//! Each subscription watches the newest `limit` messages. When the history
//! changes, the service diffs every subscriber's window before and after the
//! change and pushes only the delta as an `item` frame on the subscription's
//! request. A new message entering a full window therefore produces
//! `added(new)` plus `removed(oldest)`, the same shape a hosted document
//! store reports for a limited query.
//!
//! Subscribe takes the snapshot and registers the subscriber under one write
//! lock, so no change can fall between the two.
//!
//! ERROR HANDLING
//! ==============
//! Creates are persisted before they are published; a database failure is
//! returned to the caller and nothing is broadcast. Fan-out uses `try_send`:
//! a closed connection queue drops the subscription, a full one drops that
//! batch with a warning (the client resynchronizes on reconnect).

use std::collections::HashMap;

use frames::feed::{Change, ChangeBatch, FeedQuery, Message, NewMessage, newest_first};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Frame, data_from_value};
use crate::state::{AppState, FeedState, Subscriber, SubscriptionKey};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("subscription not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for FeedError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "E_INVALID_MESSAGE",
            Self::InvalidQuery(_) => "E_INVALID_QUERY",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

// =============================================================================
// HISTORY
// =============================================================================

/// Load the newest messages from storage into the live history.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn hydrate(state: &AppState) -> Result<usize, FeedError> {
    let history = state.feed.read().await.history;
    let mut rows = state.repo.recent(history).await?;
    rows.sort_by(newest_first);

    let mut feed = state.feed.write().await;
    feed.recent = rows;
    feed.recent.truncate(history);
    Ok(feed.recent.len())
}

/// The newest `limit` messages, clamped to the history size.
pub async fn recent(state: &AppState, limit: usize) -> Vec<Message> {
    state.feed.read().await.window(limit).to_vec()
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// Parse and validate the query carried by a subscribe request.
///
/// # Errors
///
/// Returns [`FeedError::InvalidQuery`] for malformed payloads or query
/// shapes the feed does not serve.
pub fn parse_query(req: &Frame) -> Result<FeedQuery, FeedError> {
    let query: FeedQuery =
        serde_json::from_value(req.data_value()).map_err(|e| FeedError::InvalidQuery(e.to_string()))?;
    if !query.is_supported() {
        return Err(FeedError::InvalidQuery(format!(
            "unsupported query on {} ordered by {} (limit {})",
            query.collection, query.order_by, query.limit
        )));
    }
    Ok(query)
}

/// Register a subscription for `req` and return its initial snapshot.
///
/// The window is clamped to the history size.
///
/// # Errors
///
/// Returns [`FeedError::InvalidQuery`] if the query is unsupported or this
/// connection already holds a subscription under the request ID.
pub async fn subscribe(
    state: &AppState,
    client_id: Uuid,
    req: &Frame,
    tx: mpsc::Sender<Frame>,
) -> Result<ChangeBatch, FeedError> {
    let query = parse_query(req)?;

    let key: SubscriptionKey = (client_id, req.id);
    let mut feed = state.feed.write().await;
    if feed.subscribers.contains_key(&key) {
        return Err(FeedError::InvalidQuery(format!("already subscribed: {}", req.id)));
    }

    let limit = query.limit.min(feed.history);
    let snapshot = ChangeBatch::snapshot(feed.window(limit));
    feed.subscribers
        .insert(key, Subscriber { client_id, limit, request: req.clone(), tx });

    info!(%client_id, subscription = %req.id, limit, "feed: subscribed");
    Ok(snapshot)
}

/// Remove one subscription owned by `client_id`, returning it.
///
/// # Errors
///
/// Returns [`FeedError::NotFound`] if no such subscription exists for this
/// client.
pub async fn unsubscribe(state: &AppState, client_id: Uuid, subscription_id: Uuid) -> Result<Subscriber, FeedError> {
    let removed = state
        .feed
        .write()
        .await
        .subscribers
        .remove(&(client_id, subscription_id))
        .ok_or(FeedError::NotFound(subscription_id))?;
    info!(%client_id, subscription = %subscription_id, "feed: unsubscribed");
    Ok(removed)
}

/// Drop every subscription owned by a disconnected client.
pub async fn drop_client(state: &AppState, client_id: Uuid) -> usize {
    let mut feed = state.feed.write().await;
    let before = feed.subscribers.len();
    feed.subscribers.retain(|_, sub| sub.client_id != client_id);
    before - feed.subscribers.len()
}

// =============================================================================
// WRITES
// =============================================================================

/// Validate, persist, and publish a new message. A blank name is stored as
/// absent.
///
/// # Errors
///
/// Returns [`FeedError::InvalidMessage`] for payloads outside the field
/// limits and [`FeedError::Database`] if the insert fails.
pub async fn create(state: &AppState, new: NewMessage) -> Result<Message, FeedError> {
    let new = NewMessage::from_form(new.name.as_deref().unwrap_or_default(), &new.text, new.timestamp);
    new.validate().map_err(FeedError::InvalidMessage)?;

    let stored = state.repo.insert(Uuid::new_v4(), &new).await?;
    let notified = publish(state, stored.clone()).await;

    info!(id = %stored.id, notified, "feed: message created");
    Ok(stored)
}

/// Insert or replace a message in the live history and push window deltas
/// to every affected subscriber. Returns how many subscribers were notified.
pub async fn publish(state: &AppState, message: Message) -> usize {
    let mut feed = state.feed.write().await;

    let before: HashMap<SubscriptionKey, Vec<Message>> = feed
        .subscribers
        .iter()
        .map(|(key, sub)| (*key, feed.window(sub.limit).to_vec()))
        .collect();

    insert_sorted(&mut feed, message);

    let mut notified = 0;
    let mut closed = Vec::new();
    for (key, sub) in &feed.subscribers {
        let old = before.get(key).map_or(&[][..], Vec::as_slice);
        let changes = window_changes(old, feed.window(sub.limit));
        if changes.is_empty() {
            continue;
        }

        let item = sub.request.item(data_from_value(ChangeBatch::delta(changes).to_value()));
        match sub.tx.try_send(item) {
            Ok(()) => notified += 1,
            Err(TrySendError::Full(_)) => {
                warn!(client_id = %sub.client_id, subscription = %sub.request.id, "feed: subscriber queue full, batch dropped");
            }
            Err(TrySendError::Closed(_)) => closed.push(*key),
        }
    }

    for key in closed {
        feed.subscribers.remove(&key);
    }
    notified
}

fn insert_sorted(feed: &mut FeedState, message: Message) {
    feed.recent.retain(|m| m.id != message.id);
    let at = feed
        .recent
        .partition_point(|m| newest_first(m, &message).is_lt());
    feed.recent.insert(at, message);
    let history = feed.history;
    feed.recent.truncate(history);
}

/// Diff two windows of the same query.
///
/// Removals come first, then in-place modifications, then additions, so a
/// receiver applying the list in order never holds two entries with the same
/// ID.
#[must_use]
pub fn window_changes(before: &[Message], after: &[Message]) -> Vec<Change> {
    let mut changes = Vec::new();

    for old in before {
        if !after.iter().any(|m| m.id == old.id) {
            changes.push(Change::removed(old.clone()));
        }
    }
    for new in after {
        match before.iter().find(|m| m.id == new.id) {
            Some(old) if old != new => changes.push(Change::modified(new.clone())),
            Some(_) => {}
            None => changes.push(Change::added(new.clone())),
        }
    }

    changes
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;
