//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components render page chrome. They receive their collaborators as props
//! and keep their own state in `state` containers.

pub mod navbar;
