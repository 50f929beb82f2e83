//! Frame: the universal message type of the feed service.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket exchange is a Frame. Clients send request frames, the
//! server dispatches by syscall prefix, and responses flow back as
//! item/done/error frames. On the wire frames are the protobuf-encoded
//! `frames::Frame`; inside the server they carry typed IDs and a flat map.
//!
//! DESIGN
//! ======
//! - Flat data: the payload is always `Map<String, Value>` at the top level.
//! - Responses correlate to requests via `parent_id`.
//! - The WS handler routes on `syscall` prefix ("feed:") and never inspects
//!   `data` itself.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use frames::Status;

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub from: Option<String>,
    pub syscall: String,
    pub status: Status,
    pub data: Data,
}

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Reasons an inbound wire frame cannot be lifted into a server frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameParseError {
    #[error("invalid frame id: {0}")]
    InvalidId(String),
    #[error("invalid parent id: {0}")]
    InvalidParentId(String),
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every syscall.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            collection: None,
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a cancel frame targeting a previously submitted request.
    #[must_use]
    pub fn cancel(target_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(target_id),
            ts: now_ms(),
            collection: None,
            from: None,
            syscall: String::new(),
            status: Status::Cancel,
            data: Data::new(),
        }
    }

    /// Create an item response carrying one result.
    #[must_use]
    pub fn item(&self, data: Data) -> Self {
        self.reply(Status::Item, data)
    }

    /// Create a done response. Terminal, carries no data.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Create a done response carrying a payload. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `parent_id`, `collection`, and `syscall`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            collection: self.collection.clone(),
            from: None,
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

impl Frame {
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the syscall operation (everything after the first ':').
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }

    /// View the payload as a JSON object, for typed deserialization.
    #[must_use]
    pub fn data_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.data.clone().into_iter().collect())
    }
}

/// Flatten an arbitrary JSON object into frame data; non-objects yield an
/// empty map.
#[must_use]
pub fn data_from_value(value: serde_json::Value) -> Data {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

impl From<&Frame> for frames::Frame {
    fn from(frame: &Frame) -> Self {
        Self {
            id: frame.id.to_string(),
            parent_id: frame.parent_id.map(|id| id.to_string()),
            ts: frame.ts,
            collection: frame.collection.clone(),
            from: frame.from.clone(),
            syscall: frame.syscall.clone(),
            status: frame.status,
            data: frame.data_value(),
        }
    }
}

impl TryFrom<frames::Frame> for Frame {
    type Error = FrameParseError;

    fn try_from(wire: frames::Frame) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .parse()
            .map_err(|_| FrameParseError::InvalidId(wire.id.clone()))?;
        let parent_id = match wire.parent_id {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| FrameParseError::InvalidParentId(raw.clone()))?,
            ),
            None => None,
        };

        Ok(Self {
            id,
            parent_id,
            ts: wire.ts,
            collection: wire.collection,
            from: wire.from,
            syscall: wire.syscall,
            status: wire.status,
            data: data_from_value(wire.data),
        })
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
