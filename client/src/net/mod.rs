//! Network layer: the message store seam and its implementations.
//!
//! DESIGN
//! ======
//! `store` defines what the UI needs from a document store. `feed_frames`
//! maps that onto the frame protocol and `session` tracks queries and
//! creates across reconnects; `ws_store` drives both over a browser
//! WebSocket and is compiled only for the hydrate build.

pub mod feed_frames;
pub mod session;
pub mod store;
#[cfg(feature = "hydrate")]
pub mod ws_store;
