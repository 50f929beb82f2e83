//! Protobuf encoding of frames.
//!
//! The payload is a oneof. For each (syscall, status) pair the feed protocol
//! defines there is a typed record; it is used only when the record
//! re-serializes to exactly the frame's JSON, so decoding always returns the
//! frame that was encoded. Everything else travels as a generic
//! `google.protobuf.Value`, whose numbers are doubles.

use prost::Message as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::feed::{
    Change, ChangeBatch, ChangeKind, Direction, FeedQuery, Message, NewMessage, SYSCALL_CREATE, SYSCALL_SUBSCRIBE,
};
use crate::{CodecError, Frame, Status};

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

pub(crate) fn encode(frame: &Frame) -> Vec<u8> {
    WireFrame {
        id: frame.id.clone(),
        parent_id: frame.parent_id.clone(),
        ts: frame.ts,
        collection: frame.collection.clone(),
        from: frame.from.clone(),
        syscall: frame.syscall.clone(),
        status: WireStatus::from(frame.status) as i32,
        payload: Some(Payload::for_frame(frame)),
    }
    .encode_to_vec()
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    let status = WireStatus::try_from(wire.status)
        .map(Status::from)
        .map_err(|_| CodecError::InvalidStatus(wire.status))?;
    let data = match wire.payload {
        Some(payload) => payload.into_json()?,
        None => Value::Object(Map::new()),
    };

    Ok(Frame {
        id: wire.id,
        parent_id: wire.parent_id,
        ts: wire.ts,
        collection: wire.collection,
        from: wire.from,
        syscall: wire.syscall,
        status,
        data,
    })
}

// =============================================================================
// PAYLOAD SELECTION
// =============================================================================

impl Payload {
    fn for_frame(frame: &Frame) -> Self {
        Self::typed(frame).unwrap_or_else(|| Self::Json(json_to_proto(&frame.data)))
    }

    fn typed(frame: &Frame) -> Option<Self> {
        let data = &frame.data;
        let payload = match (frame.status, frame.syscall.as_str()) {
            (Status::Error, _) => Self::Error(WireError::from_json(data)?),
            (Status::Request, SYSCALL_SUBSCRIBE) => Self::Query(WireQuery::from(&exact::<FeedQuery>(data)?)),
            (Status::Item, SYSCALL_SUBSCRIBE) => Self::Batch(WireBatch::from(exact::<ChangeBatch>(data)?)),
            (Status::Request, SYSCALL_CREATE) => Self::NewMessage(WireNewMessage::from(exact::<NewMessage>(data)?)),
            (Status::Done, SYSCALL_CREATE) => Self::Stored(WireMessage::from(exact::<Message>(data)?)),
            _ => return None,
        };
        Some(payload)
    }

    fn into_json(self) -> Result<Value, CodecError> {
        Ok(match self {
            Self::Json(value) => proto_to_json(&value),
            Self::Query(query) => FeedQuery::try_from(query)?.to_value(),
            Self::Batch(batch) => ChangeBatch::try_from(batch)?.to_value(),
            Self::NewMessage(new) => to_json(&NewMessage::from(new)),
            Self::Stored(message) => to_json(&Message::from(message)),
            Self::Error(error) => error.into_json(),
        })
    }
}

/// Parse `data` as `T` only if nothing is lost by doing so.
fn exact<T: Serialize + DeserializeOwned>(data: &Value) -> Option<T> {
    let typed: T = serde_json::from_value(data.clone()).ok()?;
    let same = serde_json::to_value(&typed).is_ok_and(|v| v == *data);
    same.then_some(typed)
}

fn to_json(record: &impl Serialize) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

// =============================================================================
// WIRE MESSAGES
// =============================================================================

#[derive(Clone, PartialEq, prost::Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, optional, tag = "4")]
    collection: Option<String>,
    #[prost(string, optional, tag = "5")]
    from: Option<String>,
    #[prost(string, tag = "6")]
    syscall: String,
    #[prost(enumeration = "WireStatus", tag = "7")]
    status: i32,
    #[prost(oneof = "Payload", tags = "8, 9, 10, 11, 12, 13")]
    payload: Option<Payload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
enum Payload {
    #[prost(message, tag = "8")]
    Json(prost_types::Value),
    #[prost(message, tag = "9")]
    Query(WireQuery),
    #[prost(message, tag = "10")]
    Batch(WireBatch),
    #[prost(message, tag = "11")]
    NewMessage(WireNewMessage),
    #[prost(message, tag = "12")]
    Stored(WireMessage),
    #[prost(message, tag = "13")]
    Error(WireError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireStatus {
    Request = 0,
    Done = 1,
    Error = 2,
    Cancel = 3,
    Item = 4,
}

impl From<Status> for WireStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Request => Self::Request,
            Status::Item => Self::Item,
            Status::Done => Self::Done,
            Status::Error => Self::Error,
            Status::Cancel => Self::Cancel,
        }
    }
}

impl From<WireStatus> for Status {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Request => Self::Request,
            WireStatus::Item => Self::Item,
            WireStatus::Done => Self::Done,
            WireStatus::Error => Self::Error,
            WireStatus::Cancel => Self::Cancel,
        }
    }
}

// -----------------------------------------------------------------------------
// Query
// -----------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
struct WireQuery {
    #[prost(string, tag = "1")]
    collection: String,
    #[prost(string, tag = "2")]
    order_by: String,
    #[prost(enumeration = "WireDirection", tag = "3")]
    direction: i32,
    #[prost(uint64, tag = "4")]
    limit: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireDirection {
    Desc = 0,
    Asc = 1,
}

impl From<&FeedQuery> for WireQuery {
    fn from(query: &FeedQuery) -> Self {
        let direction = match query.direction {
            Direction::Desc => WireDirection::Desc,
            Direction::Asc => WireDirection::Asc,
        };
        Self {
            collection: query.collection.clone(),
            order_by: query.order_by.clone(),
            direction: direction as i32,
            limit: u64::try_from(query.limit).unwrap_or(u64::MAX),
        }
    }
}

impl TryFrom<WireQuery> for FeedQuery {
    type Error = CodecError;

    fn try_from(wire: WireQuery) -> Result<Self, CodecError> {
        let direction = match WireDirection::try_from(wire.direction) {
            Ok(WireDirection::Desc) => Direction::Desc,
            Ok(WireDirection::Asc) => Direction::Asc,
            Err(_) => return Err(CodecError::InvalidEnum { field: "direction", value: wire.direction }),
        };
        Ok(Self {
            collection: wire.collection,
            order_by: wire.order_by,
            direction,
            limit: usize::try_from(wire.limit).unwrap_or(usize::MAX),
        })
    }
}

// -----------------------------------------------------------------------------
// Messages and change batches
// -----------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
struct WireMessage {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    name: Option<String>,
    #[prost(string, tag = "3")]
    text: String,
    #[prost(int64, tag = "4")]
    timestamp: i64,
}

impl From<Message> for WireMessage {
    fn from(m: Message) -> Self {
        Self { id: m.id, name: m.name, text: m.text, timestamp: m.timestamp }
    }
}

impl From<WireMessage> for Message {
    fn from(w: WireMessage) -> Self {
        Self { id: w.id, name: w.name, text: w.text, timestamp: w.timestamp }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireNewMessage {
    #[prost(string, optional, tag = "1")]
    name: Option<String>,
    #[prost(string, tag = "2")]
    text: String,
    #[prost(int64, tag = "3")]
    timestamp: i64,
}

impl From<NewMessage> for WireNewMessage {
    fn from(m: NewMessage) -> Self {
        Self { name: m.name, text: m.text, timestamp: m.timestamp }
    }
}

impl From<WireNewMessage> for NewMessage {
    fn from(w: WireNewMessage) -> Self {
        Self { name: w.name, text: w.text, timestamp: w.timestamp }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireChangeKind {
    Added = 0,
    Modified = 1,
    Removed = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireChange {
    #[prost(enumeration = "WireChangeKind", tag = "1")]
    kind: i32,
    #[prost(message, optional, tag = "2")]
    message: Option<WireMessage>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct WireBatch {
    #[prost(bool, tag = "1")]
    reset: bool,
    #[prost(message, repeated, tag = "2")]
    changes: Vec<WireChange>,
}

impl From<ChangeBatch> for WireBatch {
    fn from(batch: ChangeBatch) -> Self {
        let changes = batch
            .changes
            .into_iter()
            .map(|change| {
                let kind = match change.kind {
                    ChangeKind::Added => WireChangeKind::Added,
                    ChangeKind::Modified => WireChangeKind::Modified,
                    ChangeKind::Removed => WireChangeKind::Removed,
                };
                WireChange { kind: kind as i32, message: Some(change.message.into()) }
            })
            .collect();
        Self { reset: batch.reset, changes }
    }
}

impl TryFrom<WireBatch> for ChangeBatch {
    type Error = CodecError;

    fn try_from(wire: WireBatch) -> Result<Self, CodecError> {
        let changes = wire
            .changes
            .into_iter()
            .map(|change| {
                let kind = match WireChangeKind::try_from(change.kind) {
                    Ok(WireChangeKind::Added) => ChangeKind::Added,
                    Ok(WireChangeKind::Modified) => ChangeKind::Modified,
                    Ok(WireChangeKind::Removed) => ChangeKind::Removed,
                    Err(_) => return Err(CodecError::InvalidEnum { field: "change kind", value: change.kind }),
                };
                Ok(Change { kind, message: change.message.unwrap_or_default().into() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { reset: wire.reset, changes })
    }
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

/// Error payload: `message` always, `code` and `retryable` when the error
/// was typed.
#[derive(Clone, PartialEq, prost::Message)]
struct WireError {
    #[prost(string, optional, tag = "1")]
    code: Option<String>,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(bool, optional, tag = "3")]
    retryable: Option<bool>,
}

impl WireError {
    fn from_json(data: &Value) -> Option<Self> {
        let fields = data.as_object()?;
        let message = fields.get("message")?.as_str()?.to_owned();
        let code = match fields.get("code") {
            Some(v) => Some(v.as_str()?.to_owned()),
            None => None,
        };
        let retryable = match fields.get("retryable") {
            Some(v) => Some(v.as_bool()?),
            None => None,
        };
        let known = 1 + usize::from(code.is_some()) + usize::from(retryable.is_some());
        (fields.len() == known).then_some(Self { code, message, retryable })
    }

    fn into_json(self) -> Value {
        let mut fields = Map::new();
        if let Some(code) = self.code {
            fields.insert("code".into(), Value::String(code));
        }
        fields.insert("message".into(), Value::String(self.message));
        if let Some(retryable) = self.retryable {
            fields.insert("retryable".into(), Value::Bool(retryable));
        }
        Value::Object(fields)
    }
}

// =============================================================================
// GENERIC JSON
// =============================================================================

fn json_to_proto(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue { values: v.iter().map(json_to_proto).collect() }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v.iter().map(|(k, v)| (k.clone(), json_to_proto(v))).collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::NumberValue(v)) => number_to_json(*v),
        Some(Kind::StringValue(v)) => Value::String(v.clone()),
        Some(Kind::BoolValue(v)) => Value::Bool(*v),
        Some(Kind::StructValue(v)) => {
            Value::Object(v.fields.iter().map(|(k, v)| (k.clone(), proto_to_json(v))).collect())
        }
        Some(Kind::ListValue(v)) => Value::Array(v.values.iter().map(proto_to_json).collect()),
    }
}

/// Whole doubles inside the exactly-representable range come back as
/// integers.
#[allow(clippy::cast_possible_truncation)]
fn number_to_json(v: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
        return Value::from(v as i64);
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}
