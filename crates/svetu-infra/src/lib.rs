//! Infrastructure layer for Sve Tu drafts.
//!
//! Contains the SQLite implementation of the `KvStore` trait defined in
//! `svetu-core`, the `config.toml` loader, and data directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
