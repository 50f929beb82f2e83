//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the message repository and the live feed: the most recent
//! messages (newest first) plus every open subscription. Postgres is the
//! durable copy; the in-memory history is what subscribers are served from.

use std::collections::HashMap;
use std::sync::Arc;

use frames::feed::Message;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;
use crate::services::store::MessageRepo;

// =============================================================================
// SUBSCRIBER
// =============================================================================

/// Identifies a subscription: the owning connection and the ID of its
/// subscribe request. Request IDs are chosen by clients, so they are only
/// unique per connection.
pub type SubscriptionKey = (Uuid, Uuid);

/// One live `feed:subscribe` stream.
#[derive(Debug)]
pub struct Subscriber {
    /// Connection that opened the subscription.
    pub client_id: Uuid,
    /// Window size: the subscriber sees the newest `limit` messages.
    pub limit: usize,
    /// The original request; change batches are sent as `item` replies to it.
    pub request: Frame,
    /// Outbound queue of the owning connection.
    pub tx: mpsc::Sender<Frame>,
}

// =============================================================================
// FEED STATE
// =============================================================================

/// Live feed, kept in memory for real-time fan-out.
pub struct FeedState {
    /// Most recent messages, newest first, at most `history` entries.
    pub recent: Vec<Message>,
    /// Capacity of `recent` and the largest window a subscriber may open.
    pub history: usize,
    /// Open subscriptions keyed by owner and subscribe request ID.
    pub subscribers: HashMap<SubscriptionKey, Subscriber>,
}

impl FeedState {
    #[must_use]
    pub fn new(history: usize) -> Self {
        Self { recent: Vec::new(), history, subscribers: HashMap::new() }
    }

    /// The newest `limit` messages.
    #[must_use]
    pub fn window(&self, limit: usize) -> &[Message] {
        &self.recent[..limit.min(self.recent.len())]
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn MessageRepo>,
    pub feed: Arc<RwLock<FeedState>>,
    /// Outbound frame queue capacity for each WebSocket connection.
    pub ws_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(repo: Arc<dyn MessageRepo>, history: usize, ws_channel_capacity: usize) -> Self {
        Self { repo, feed: Arc::new(RwLock::new(FeedState::new(history))), ws_channel_capacity }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;
