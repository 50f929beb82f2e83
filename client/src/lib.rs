//! # mandelbrot-client
//!
//! Leptos + WASM frontend for the mandelbrot site: the navigation bar, the
//! static pages and the live guestbook.
//!
//! This crate contains pages, components, application state, the message
//! store seam and its WebSocket implementation. State lives in plain
//! containers under `state` so it can be tested without a browser.

pub mod app;
pub mod components;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

/// WASM entry point: hydrate the server-rendered page.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        leptos::logging::warn!("console logger unavailable: {e}");
    }
    leptos::mount::hydrate_body(app::App);
}
