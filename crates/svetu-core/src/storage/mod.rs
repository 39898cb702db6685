//! Key-value storage port and its in-process implementation.

pub mod kv_store;
pub mod memory;
