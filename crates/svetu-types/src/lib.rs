//! Shared domain types for Sve Tu listing drafts.
//!
//! This crate contains the draft records persisted on behalf of a user
//! while a marketplace listing is being composed, the portable export
//! document, configuration types, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod draft;
pub mod error;
