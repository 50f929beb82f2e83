//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration and delegates state handling
//! to the `state` controllers.

pub mod explore;
pub mod guestbook;
pub mod static_pages;
