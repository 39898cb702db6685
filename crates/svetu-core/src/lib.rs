//! Business logic and storage trait definitions for Sve Tu listing drafts.
//!
//! This crate defines the "port" (the `KvStore` trait) that the
//! infrastructure layer implements, plus the draft store built on top of
//! it. It depends only on `svetu-types` -- never on `svetu-infra` or any
//! database/IO crate.

pub mod draft;
pub mod storage;
