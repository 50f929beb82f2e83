//! Message REST routes.
//!
//! Plain HTTP access to the same feed the WebSocket serves: read the newest
//! window, or post a message that is then pushed to live subscribers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::warn;

use frames::feed::{DEFAULT_FEED_LIMIT, Message, NewMessage};

use crate::services::feed::{self, FeedError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub(crate) fn feed_error_to_status(err: FeedError) -> StatusCode {
    match err {
        FeedError::InvalidMessage(_) | FeedError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        FeedError::NotFound(_) => StatusCode::NOT_FOUND,
        FeedError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `GET /api/messages?limit=N`: newest messages first.
pub async fn list_messages(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Vec<Message>> {
    let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    Json(feed::recent(&state, limit).await)
}

/// `POST /api/messages`: store a message and notify subscribers.
pub async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), StatusCode> {
    match feed::create(&state, body).await {
        Ok(stored) => Ok((StatusCode::CREATED, Json(stored))),
        Err(e) => {
            warn!(error = %e, "messages: create failed");
            Err(feed_error_to_status(e))
        }
    }
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod messages_test;
