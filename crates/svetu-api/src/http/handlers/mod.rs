//! REST API request handlers.

pub mod draft;
