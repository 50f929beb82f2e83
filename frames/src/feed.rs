//! Feed records carried inside frame payloads.
//!
//! DESIGN
//! ======
//! The feed is a single ordered collection of guestbook messages. A client
//! opens a live query (`FeedQuery`) and receives `ChangeBatch` payloads as
//! `item` frames. The first batch of every subscription is a full snapshot
//! (`reset = true`); later batches carry only the delta.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Collection name for guestbook messages.
pub const MESSAGES_COLLECTION: &str = "messages";

/// Window size the guestbook subscribes with.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Maximum characters accepted for a display name.
pub const MAX_NAME_CHARS: usize = 30;

/// Maximum characters accepted for a message body.
pub const MAX_TEXT_CHARS: usize = 200;

/// Syscall for opening a live feed subscription.
pub const SYSCALL_SUBSCRIBE: &str = "feed:subscribe";

/// Syscall for creating a new message.
pub const SYSCALL_CREATE: &str = "feed:create";

/// A stored guestbook message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier.
    pub id: String,
    /// Author name; absent when the visitor left it blank.
    #[serde(default)]
    pub name: Option<String>,
    /// Message body.
    pub text: String,
    /// Client-assigned creation time in milliseconds since the Unix epoch.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub timestamp: i64,
}

/// Fields submitted to create a message. The store assigns the `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub name: Option<String>,
    pub text: String,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub timestamp: i64,
}

impl NewMessage {
    /// Build a submission from raw form input.
    ///
    /// A name that is empty or whitespace-only becomes `None`, never `""`.
    /// Any other name is kept exactly as typed.
    #[must_use]
    pub fn from_form(name: &str, text: &str, timestamp: i64) -> Self {
        Self {
            name: if name.trim().is_empty() { None } else { Some(name.to_owned()) },
            text: text.to_owned(),
            timestamp,
        }
    }

    /// Attach a store-assigned ID.
    #[must_use]
    pub fn into_message(self, id: String) -> Message {
        Message { id, name: self.name, text: self.text, timestamp: self.timestamp }
    }

    /// Check the field limits the feed enforces.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the text is blank or a field is
    /// longer than allowed.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("text must not be empty".into());
        }
        if self.text.chars().count() > MAX_TEXT_CHARS {
            return Err(format!("text exceeds {MAX_TEXT_CHARS} characters"));
        }
        if let Some(name) = &self.name {
            if name.chars().count() > MAX_NAME_CHARS {
                return Err(format!("name exceeds {MAX_NAME_CHARS} characters"));
            }
        }
        Ok(())
    }
}

/// What happened to a record in the subscribed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One change notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub message: Message,
}

impl Change {
    #[must_use]
    pub fn added(message: Message) -> Self {
        Self { kind: ChangeKind::Added, message }
    }

    #[must_use]
    pub fn modified(message: Message) -> Self {
        Self { kind: ChangeKind::Modified, message }
    }

    #[must_use]
    pub fn removed(message: Message) -> Self {
        Self { kind: ChangeKind::Removed, message }
    }
}

/// Changes delivered together for one synchronization round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// The batch is a full snapshot; receivers drop their local view first.
    #[serde(default)]
    pub reset: bool,
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    /// A full snapshot of the given window, newest first.
    #[must_use]
    pub fn snapshot(messages: &[Message]) -> Self {
        Self { reset: true, changes: messages.iter().cloned().map(Change::added).collect() }
    }

    /// An incremental batch.
    #[must_use]
    pub fn delta(changes: Vec<Change>) -> Self {
        Self { reset: false, changes }
    }

    /// Serialize into a frame payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Sort direction for a feed query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// A live query over a collection.
///
/// The feed only supports `timestamp desc`; the fields are on the wire so a
/// store can reject anything else explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub collection: String,
    pub order_by: String,
    #[serde(default)]
    pub direction: Direction,
    pub limit: usize,
}

impl FeedQuery {
    /// The most recent `limit` messages, newest first.
    #[must_use]
    pub fn recent_messages(limit: usize) -> Self {
        Self {
            collection: MESSAGES_COLLECTION.to_owned(),
            order_by: "timestamp".to_owned(),
            direction: Direction::Desc,
            limit,
        }
    }

    /// Whether the query is the `timestamp desc` shape the feed serves.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.collection == MESSAGES_COLLECTION
            && self.order_by == "timestamp"
            && self.direction == Direction::Desc
            && self.limit > 0
    }

    /// Serialize into a frame payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Ordering used everywhere a window is materialized: newest first, ties
/// broken by descending ID so every replica agrees.
#[must_use]
pub fn newest_first(a: &Message, b: &Message) -> std::cmp::Ordering {
    b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id))
}

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        _ => Err(D::Error::custom("expected number")),
    }
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;
