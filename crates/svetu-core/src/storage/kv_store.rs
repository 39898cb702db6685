//! Key-value store trait.
//!
//! Defines the flat string key space drafts are persisted in.
//! Implementations live in svetu-infra (SQLite) and in `storage::memory`.

use svetu_types::error::StorageError;

/// Trait for a flat, string-keyed persistent store.
///
/// Values are opaque text. Callers own the encoding, which means a stored
/// value may fail to decode and callers must handle that.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait KvStore: Send + Sync {
    /// Get a value by key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Set a value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Remove a key. No-op if key does not exist.
    fn remove(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// List all keys starting with `prefix`, sorted ascending.
    fn keys_with_prefix(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StorageError>> + Send;
}
