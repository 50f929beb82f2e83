//! WebSocket-backed `MessageStore` for the browser.
//!
//! The store keeps one socket to `/api/ws` and reconnects with exponential
//! backoff (1 s doubling to 10 s). Live queries outlive the socket: when a
//! new session starts every open query is re-issued under its original ID
//! and the server answers with a fresh snapshot (`reset = true`), which the
//! guestbook applies by replacing its view.
//!
//! The bookkeeping (open queries, pending creates) lives in
//! [`Session`](super::session::Session); this module only moves frames
//! between it and the socket.

use std::cell::RefCell;
use std::rc::Rc;

use frames::Frame;
use frames::feed::{FeedQuery, NewMessage};
use futures::channel::mpsc;
use futures::future::LocalBoxFuture;
use futures::{FutureExt, StreamExt};

use super::feed_frames::socket_url;
use super::session::{Reaction, Session};
use super::store::{BatchListener, MessageStore, StoreError};
use crate::state::subscription::Subscription;

const INITIAL_BACKOFF_MS: u32 = 1_000;
const MAX_BACKOFF_MS: u32 = 10_000;

#[derive(Clone)]
pub struct WsStore {
    session: Rc<RefCell<Session>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl WsStore {
    /// Create the store and spawn its connection loop.
    pub fn connect() -> Self {
        let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
        let store = Self { session: Rc::default(), tx };
        leptos::task::spawn_local(run(store.clone(), rx));
        store
    }

    fn send(&self, frame: &Frame) -> bool {
        self.tx.unbounded_send(frames::encode_frame(frame)).is_ok()
    }

    fn handle(&self, frame: &Frame) {
        let reaction = self.session.borrow_mut().receive(frame);
        match reaction {
            Reaction::Nothing => {}
            Reaction::Send(outgoing) => {
                for frame in &outgoing {
                    self.send(frame);
                }
            }
            Reaction::Deliver(listener, batch) => listener(batch),
            Reaction::RetryLater(id) => {
                let store = self.clone();
                leptos::task::spawn_local(async move {
                    gloo_timers::future::sleep(std::time::Duration::from_millis(u64::from(INITIAL_BACKOFF_MS))).await;
                    let frame = store.session.borrow().retry(&id);
                    if let Some(frame) = frame {
                        store.send(&frame);
                    }
                });
            }
        }
    }
}

impl MessageStore for WsStore {
    fn subscribe(&self, query: FeedQuery, on_batch: BatchListener) -> Subscription {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = self.session.borrow_mut().open(&id, query, on_batch);
        if let Some(frame) = frame {
            self.send(&frame);
        }

        let store = self.clone();
        Subscription::new(move || {
            let cancel = store.session.borrow_mut().close(&id);
            if let Some(frame) = cancel {
                store.send(&frame);
            }
        })
    }

    fn create(&self, message: NewMessage) -> LocalBoxFuture<'static, Result<(), StoreError>> {
        let id = uuid::Uuid::new_v4().to_string();
        let begun = self.session.borrow_mut().begin_create(&id, &message);
        let (frame, reply) = match begun {
            Ok(begun) => begun,
            Err(e) => return futures::future::ready(Err(e)).boxed_local(),
        };

        if !self.send(&frame) {
            self.session.borrow_mut().abandon_create(&id);
            return futures::future::ready(Err(StoreError::Disconnected)).boxed_local();
        }

        async move { reply.await.unwrap_or(Err(StoreError::Disconnected)) }.boxed_local()
    }
}

/// Connection loop with reconnect.
async fn run(store: WsStore, rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    let rx = Rc::new(RefCell::new(rx));
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        let url = page_socket_url();
        match connect_and_run(&url, &store, &rx).await {
            Ok(()) => leptos::logging::log!("feed: socket closed"),
            Err(e) => leptos::logging::warn!("feed: socket error: {e}"),
        }

        let was_connected = store.session.borrow_mut().disconnected();
        if was_connected {
            backoff_ms = INITIAL_BACKOFF_MS;
        }

        // Frames queued for the old session must not leak into the next one.
        while let Ok(Some(_)) = rx.borrow_mut().try_next() {}

        gloo_timers::future::sleep(std::time::Duration::from_millis(u64::from(backoff_ms))).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}

fn page_socket_url() -> String {
    let Some(location) = web_sys::window().map(|w| w.location()) else {
        return socket_url("", "localhost:3000");
    };
    let protocol = location.protocol().unwrap_or_default();
    let host = location.host().unwrap_or_else(|_| "localhost:3000".to_owned());
    socket_url(&protocol, &host)
}

/// Connect to the WebSocket and process messages until disconnect.
async fn connect_and_run(
    url: &str,
    store: &WsStore,
    rx: &Rc<RefCell<mpsc::UnboundedReceiver<Vec<u8>>>>,
) -> Result<(), String> {
    use gloo_net::websocket::Message;
    use gloo_net::websocket::futures::WebSocket;

    let ws = WebSocket::open(url).map_err(|e| e.to_string())?;
    let (mut ws_write, mut ws_read) = ws.split();

    let mut rx_borrow = rx.borrow_mut();
    let send_task = async {
        use futures::SinkExt;
        while let Some(bytes) = rx_borrow.next().await {
            if ws_write.send(Message::Bytes(bytes)).await.is_err() {
                break;
            }
        }
    };

    let recv_task = async {
        while let Some(msg) = ws_read.next().await {
            match msg {
                Ok(Message::Bytes(bytes)) => match frames::decode_frame(&bytes) {
                    Ok(frame) => store.handle(&frame),
                    Err(e) => leptos::logging::warn!("feed: undecodable frame: {e}"),
                },
                Ok(Message::Text(_)) => {}
                Err(e) => {
                    leptos::logging::warn!("feed: recv error: {e}");
                    break;
                }
            }
        }
    };

    futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await;
    Ok(())
}
