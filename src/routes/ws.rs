//! WebSocket handler: live feed subscriptions and writes.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Feed batches queued by the feed service → forward to client
//!
//! Handler functions are pure business logic: they validate, call the feed
//! service, and return an `Outcome`. The dispatch layer turns the outcome
//! into reply frames for the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. `feed:subscribe` → `item` snapshot now, further `item`s as the feed changes
//! 3. `cancel` with `parent_id` = subscribe id → subscription closed with `done`
//! 4. Close → every subscription of the connection is dropped

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use frames::feed::NewMessage;

use crate::frame::{Data, Frame, Status, data_from_value};
use crate::services::feed;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide what the sender receives; handlers never send frames directly.
#[derive(Debug)]
enum Outcome {
    /// Non-terminal `item` on the request; the stream stays open.
    Item(Data),
    /// Terminal `done` carrying data.
    Reply(Data),
    /// A fully formed frame for some earlier request (e.g. closing a stream).
    Frame(Frame),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames pushed by the feed service.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.ws_channel_capacity);

    let welcome = Frame::request("session:connected", Data::new()).with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_bytes(&state, client_id, &client_tx, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, client_id, &client_tx, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => continue,
                };
                for frame in replies {
                    let _ = send_frame(&mut socket, &frame).await;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    let dropped = feed::drop_client(&state, client_id).await;
    info!(%client_id, dropped, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one binary (protobuf) frame and process it.
async fn process_inbound_bytes(
    state: &AppState,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    bytes: &[u8],
) -> Vec<Frame> {
    let wire = match frames::decode_frame(bytes) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: undecodable inbound frame");
            return vec![gateway_error(format!("invalid frame: {e}"))];
        }
    };
    process_wire_frame(state, client_id, client_tx, wire).await
}

/// Parse one JSON text frame and process it.
async fn process_inbound_text(
    state: &AppState,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let wire: frames::Frame = match serde_json::from_str(text) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![gateway_error(format!("invalid json: {e}"))];
        }
    };
    process_wire_frame(state, client_id, client_tx, wire).await
}

async fn process_wire_frame(
    state: &AppState,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    wire: frames::Frame,
) -> Vec<Frame> {
    let mut req = match Frame::try_from(wire) {
        Ok(req) => req,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![gateway_error(e.to_string())];
        }
    };
    req.from = Some(client_id.to_string());

    info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    let result = match (req.status, req.prefix()) {
        (Status::Cancel, _) => handle_cancel(state, client_id, &req).await,
        (Status::Request, "feed") => handle_feed(state, client_id, client_tx, &req).await,
        (Status::Request, prefix) => Err(req.error(format!("unknown prefix: {prefix}"))),
        (status, _) => Err(req.error(format!("unexpected inbound status: {status:?}"))),
    };

    match result {
        Ok(Outcome::Item(data)) => vec![req.item(data)],
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Frame(frame)) => vec![frame],
        Err(err_frame) => vec![err_frame],
    }
}

fn gateway_error(message: impl Into<String>) -> Frame {
    Frame::request("gateway:error", Data::new()).with_data("message", message.into())
}

// =============================================================================
// FEED HANDLERS
// =============================================================================

async fn handle_feed(
    state: &AppState,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.op() {
        "subscribe" => match feed::subscribe(state, client_id, req, client_tx.clone()).await {
            Ok(snapshot) => Ok(Outcome::Item(data_from_value(snapshot.to_value()))),
            Err(e) => Err(req.error_from(&e)),
        },
        "create" => {
            let new: NewMessage = serde_json::from_value(req.data_value())
                .map_err(|e| req.error_from(&feed::FeedError::InvalidMessage(e.to_string())))?;
            match feed::create(state, new).await {
                Ok(stored) => {
                    let value = serde_json::to_value(&stored).unwrap_or_default();
                    Ok(Outcome::Reply(data_from_value(value)))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        op => Err(req.error(format!("unknown feed op: {op}"))),
    }
}

async fn handle_cancel(state: &AppState, client_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let Some(target) = req.parent_id else {
        return Err(req.error("cancel requires parent_id"));
    };
    match feed::unsubscribe(state, client_id, target).await {
        Ok(sub) => Ok(Outcome::Frame(sub.request.done())),
        Err(e) => Err(req.error_from(&e)),
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    if frame.status == Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }

    let bytes = frames::encode_frame(&frames::Frame::from(frame));
    socket.send(Message::Binary(bytes.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;
