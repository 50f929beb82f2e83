//! Feed frames: building outbound requests and classifying inbound frames.
//!
//! Pure functions so the socket loop stays thin and the protocol is tested
//! without a browser.

use frames::feed::{ChangeBatch, FeedQuery, MESSAGES_COLLECTION, NewMessage, SYSCALL_CREATE, SYSCALL_SUBSCRIBE};
use frames::{Frame, Status};
use serde_json::Value;

use super::store::StoreError;

#[cfg(test)]
#[path = "feed_frames_test.rs"]
mod feed_frames_test;

/// Build a request frame with standard client metadata.
fn request_frame(id: &str, syscall: &str, data: Value) -> Frame {
    Frame {
        id: id.to_owned(),
        parent_id: None,
        ts: 0,
        collection: Some(MESSAGES_COLLECTION.to_owned()),
        from: None,
        syscall: syscall.to_owned(),
        status: Status::Request,
        data,
    }
}

#[must_use]
pub fn subscribe_frame(id: &str, query: &FeedQuery) -> Frame {
    request_frame(id, SYSCALL_SUBSCRIBE, query.to_value())
}

#[must_use]
pub fn create_frame(id: &str, message: &NewMessage) -> Frame {
    request_frame(id, SYSCALL_CREATE, serde_json::to_value(message).unwrap_or(Value::Null))
}

/// Cancel a live subscription opened by request `target`.
#[must_use]
pub fn cancel_frame(target: &str) -> Frame {
    Frame {
        id: uuid::Uuid::new_v4().to_string(),
        parent_id: Some(target.to_owned()),
        ts: 0,
        collection: None,
        from: None,
        syscall: String::new(),
        status: Status::Cancel,
        data: Value::Object(serde_json::Map::new()),
    }
}

/// WebSocket endpoint for a page served from `protocol` + `host`.
#[must_use]
pub fn socket_url(protocol: &str, host: &str) -> String {
    let scheme = if protocol.starts_with("https") { "wss" } else { "ws" };
    format!("{scheme}://{host}/api/ws")
}

/// What an inbound frame means to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// The session is ready for requests.
    Connected,
    /// A change batch for the subscription opened by `subscription`.
    Batch { subscription: String, batch: ChangeBatch },
    /// The server closed a subscription.
    Closed { subscription: String },
    /// A create request was stored.
    Created { request: String },
    /// A request failed.
    Failed { request: String, error: StoreError },
    /// The server could not read one of our frames.
    GatewayError(String),
    /// Frame the store has no use for, or a malformed payload.
    Ignored,
}

#[must_use]
pub fn classify(frame: &Frame) -> Inbound {
    match frame.syscall.as_str() {
        "session:connected" => return Inbound::Connected,
        "gateway:error" => return Inbound::GatewayError(error_message(&frame.data)),
        _ => {}
    }

    let Some(parent) = frame.parent_id.clone() else {
        return Inbound::Ignored;
    };

    match (frame.status, frame.syscall.as_str()) {
        (Status::Error, _) => Inbound::Failed { request: parent, error: rejected(&frame.data) },
        (Status::Item, SYSCALL_SUBSCRIBE) => match serde_json::from_value::<ChangeBatch>(frame.data.clone()) {
            Ok(batch) => Inbound::Batch { subscription: parent, batch },
            Err(e) => {
                leptos::logging::warn!("feed: malformed change batch: {e}");
                Inbound::Ignored
            }
        },
        (Status::Done, SYSCALL_SUBSCRIBE) => Inbound::Closed { subscription: parent },
        (Status::Done, SYSCALL_CREATE) => Inbound::Created { request: parent },
        _ => Inbound::Ignored,
    }
}

fn error_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_owned()
}

fn rejected(data: &Value) -> StoreError {
    StoreError::Rejected {
        code: data.get("code").and_then(Value::as_str).unwrap_or("E_UNKNOWN").to_owned(),
        message: error_message(data),
        retryable: data.get("retryable").and_then(Value::as_bool).unwrap_or(false),
    }
}
