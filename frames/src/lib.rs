//! Wire model shared by the feed service and the browser client.
//!
//! A [`Frame`] is one step of a request/response exchange: a `request`, then
//! any number of `item`s, then `done` or `error`. In memory the payload is a
//! JSON value. On the wire (protobuf) the payloads the feed protocol defines
//! (queries, change batches, messages, errors) are encoded as typed records;
//! anything else falls back to a generic `google.protobuf.Value`. The records
//! themselves live in [`feed`].

pub mod feed;
mod wire;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid frame status: {0}")]
    InvalidStatus(i32),
    /// A typed payload carried an enum value this build does not know.
    #[error("invalid {field}: {value}")]
    InvalidEnum { field: &'static str, value: i32 },
}

/// Position of a frame in its exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    /// One streamed result; more may follow.
    Item,
    Done,
    Error,
    /// Sent by a client to stop the exchange named by `parent_id`.
    Cancel,
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    /// Request this frame answers, or the exchange a cancel targets.
    pub parent_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    /// Collection addressed, e.g. `"messages"`.
    pub collection: Option<String>,
    pub from: Option<String>,
    /// Namespaced operation, e.g. `"feed:subscribe"`.
    pub syscall: String,
    pub status: Status,
    pub data: Value,
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    wire::encode(frame)
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes, and
/// [`CodecError::InvalidStatus`] or [`CodecError::InvalidEnum`] for enum
/// values outside the protocol.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    wire::decode(bytes)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
