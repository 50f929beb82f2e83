//! Shared client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by component (`nav`, `guestbook`) so each view depends on
//! a small focused model. Models live in `StateCell`s; controllers own the
//! subscriptions that feed them.

pub mod cell;
pub mod guestbook;
pub mod guestbook_controller;
pub mod nav;
pub mod route;
pub mod subscription;
