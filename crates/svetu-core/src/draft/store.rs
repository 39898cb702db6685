//! Draft store service.
//!
//! Persists full draft records plus a per-user index of their metadata in
//! a `KvStore`. The index is the enumerable list of a user's drafts and is
//! kept in step with the records on every save and delete.
//!
//! Reads are best-effort: missing, expired, foreign, and undecodable
//! records all come back as `None` (or are left out of lists). Corrupt
//! reads are logged and counted so they stay diagnosable. Only an
//! ownership violation, a version conflict, or a failed write is returned
//! as an error.
//!
//! Concurrency: last write wins. Two processes saving the same draft race,
//! and nothing merges or reports it. With `optimistic_locking` enabled a
//! save whose version is behind the stored record is refused, but the
//! check and the write are separate backend calls, so the race window
//! still exists across processes.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::de::DeserializeOwned;
use svetu_types::config::DraftConfig;
use svetu_types::draft::{DraftId, DraftMetadata, ListingDraft, UserId};
use svetu_types::error::DraftError;
use tracing::{debug, info, warn};

use super::keys::DraftKeys;
use super::lifecycle::LifecyclePolicy;
use super::transfer;
use crate::storage::kv_store::KvStore;

/// Result of a low-level read, before it is collapsed at the public API.
enum ReadOutcome<T> {
    Found(T),
    Missing,
    Corrupt(String),
}

/// Index entries plus whether they were rebuilt from the records because
/// the stored index could not be decoded.
struct LoadedIndex {
    entries: Vec<DraftMetadata>,
    rebuilt: bool,
}

/// Service managing a user's listing drafts.
///
/// Generic over the key-value backend so tests run against
/// `InMemoryKvStore` and the binary against SQLite.
pub struct DraftStore<K: KvStore> {
    kv: K,
    keys: DraftKeys,
    policy: LifecyclePolicy,
    optimistic_locking: bool,
    corrupt_reads: AtomicU64,
}

impl<K: KvStore> DraftStore<K> {
    /// Create a store with default settings (30-day fixed TTL, last write wins).
    pub fn new(kv: K) -> Self {
        Self::with_config(kv, &DraftConfig::default())
    }

    /// Create a store configured from the `[drafts]` config section.
    pub fn with_config(kv: K, config: &DraftConfig) -> Self {
        Self {
            kv,
            keys: DraftKeys::new(config.key_prefix.clone()),
            policy: LifecyclePolicy::from_config(config),
            optimistic_locking: config.optimistic_locking,
            corrupt_reads: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// The backend drafts are persisted in.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn keys(&self) -> &DraftKeys {
        &self.keys
    }

    /// Number of reads that found a record or index but could not use it.
    pub fn corrupt_reads(&self) -> u64 {
        self.corrupt_reads.load(Ordering::Relaxed)
    }

    /// Start a new, unsaved draft for `user_id`.
    pub fn create_draft(&self, user_id: &UserId) -> ListingDraft {
        self.policy.new_draft(user_id.clone(), Utc::now())
    }

    /// Save a draft on behalf of `user_id`.
    ///
    /// Refreshes `updatedAt`, bumps `version`, writes the record, and
    /// upserts its metadata into the user's index (newest first). On
    /// failure the draft's metadata is left as it was.
    pub async fn save_draft(
        &self,
        draft: &mut ListingDraft,
        user_id: &UserId,
    ) -> Result<(), DraftError> {
        if draft.metadata.user_id != *user_id {
            warn!(
                draft_id = %draft.metadata.id,
                owner = %draft.metadata.user_id,
                actor = %user_id,
                "Refused to save a draft owned by another user"
            );
            return Err(DraftError::OwnershipViolation {
                draft_id: draft.metadata.id.clone(),
                owner: draft.metadata.user_id.clone(),
                actor: user_id.clone(),
            });
        }

        let record_key = self.keys.record_key(user_id, &draft.metadata.id);
        let stored_raw = self.kv.get(&record_key).await?;

        if let Some(raw) = stored_raw.as_deref() {
            match serde_json::from_str::<ListingDraft>(raw) {
                Ok(stored) if stored.metadata.user_id != *user_id => {
                    warn!(
                        draft_id = %draft.metadata.id,
                        owner = %stored.metadata.user_id,
                        actor = %user_id,
                        "Refused to overwrite a record owned by another user"
                    );
                    return Err(DraftError::OwnershipViolation {
                        draft_id: draft.metadata.id.clone(),
                        owner: stored.metadata.user_id,
                        actor: user_id.clone(),
                    });
                }
                Ok(stored)
                    if self.optimistic_locking
                        && stored.metadata.version > draft.metadata.version =>
                {
                    return Err(DraftError::VersionConflict {
                        draft_id: draft.metadata.id.clone(),
                        expected: draft.metadata.version,
                        actual: stored.metadata.version,
                    });
                }
                Ok(_) => {}
                // Unreadable records are overwritten
                Err(e) => self.note_corrupt(&record_key, &format!("invalid JSON: {e}")),
            }
        }

        let previous = draft.metadata.clone();
        self.policy.touch(&mut draft.metadata, Utc::now());
        draft.metadata.version += 1;

        if let Err(e) = self
            .persist(draft, user_id, &record_key, stored_raw.as_deref())
            .await
        {
            draft.metadata = previous;
            return Err(e);
        }

        debug!(
            draft_id = %draft.metadata.id,
            user_id = %user_id,
            version = draft.metadata.version,
            "Saved draft"
        );
        Ok(())
    }

    /// Write the record, then the index. If the index write fails the
    /// record is put back to `previous` so the two never disagree.
    async fn persist(
        &self,
        draft: &ListingDraft,
        user_id: &UserId,
        record_key: &str,
        previous: Option<&str>,
    ) -> Result<(), DraftError> {
        let body =
            serde_json::to_string(draft).map_err(|e| DraftError::Serialization(e.to_string()))?;
        self.kv.set(record_key, &body).await?;

        let LoadedIndex { mut entries, .. } = self.load_index(user_id).await;
        entries.retain(|m| m.id != draft.metadata.id);
        entries.push(draft.metadata.clone());

        if let Err(e) = self.write_index(user_id, entries).await {
            self.restore_record(record_key, previous).await;
            return Err(e);
        }
        Ok(())
    }

    /// List the user's non-expired drafts, most recently saved first.
    ///
    /// Expired entries are skipped, not removed.
    pub async fn get_drafts_list(&self, user_id: &UserId) -> Vec<DraftMetadata> {
        let now = Utc::now();
        let LoadedIndex { entries, .. } = self.load_index(user_id).await;

        entries
            .into_iter()
            .filter(|m| m.user_id == *user_id && !self.policy.is_expired(m, now))
            .collect()
    }

    /// Load a draft by id.
    ///
    /// Returns `None` when the draft is missing, unreadable, owned by
    /// someone else, or expired. An expired draft is deleted on the way out.
    pub async fn get_draft(&self, draft_id: &DraftId, user_id: &UserId) -> Option<ListingDraft> {
        let record_key = self.keys.record_key(user_id, draft_id);

        let draft = match self.read_json::<ListingDraft>(&record_key).await {
            ReadOutcome::Found(draft) => draft,
            ReadOutcome::Missing => return None,
            ReadOutcome::Corrupt(reason) => {
                self.note_corrupt(&record_key, &reason);
                return None;
            }
        };

        if draft.metadata.id != *draft_id {
            self.note_corrupt(&record_key, "record id does not match its key");
            return None;
        }

        if draft.metadata.user_id != *user_id {
            warn!(
                draft_id = %draft_id,
                actor = %user_id,
                "Draft record owned by another user; treating as absent"
            );
            return None;
        }

        if self.policy.is_expired(&draft.metadata, Utc::now()) {
            debug!(draft_id = %draft_id, expires_at = %draft.metadata.expires_at, "Draft expired");
            if let Err(e) = self.delete_draft(draft_id, user_id).await {
                warn!(draft_id = %draft_id, error = %e, "Failed to remove expired draft");
            }
            return None;
        }

        Some(draft)
    }

    /// Delete a draft record and its index entry.
    ///
    /// No-op if the draft does not exist. A record stored under the key
    /// but owned by someone else is left alone.
    pub async fn delete_draft(&self, draft_id: &DraftId, user_id: &UserId) -> Result<(), DraftError> {
        let record_key = self.keys.record_key(user_id, draft_id);
        let stored_raw = self.kv.get(&record_key).await?;

        if let Some(raw) = stored_raw.as_deref() {
            if let Ok(stored) = serde_json::from_str::<ListingDraft>(raw) {
                if stored.metadata.user_id != *user_id {
                    warn!(
                        draft_id = %draft_id,
                        owner = %stored.metadata.user_id,
                        actor = %user_id,
                        "Refused to delete a record owned by another user"
                    );
                    return Err(DraftError::OwnershipViolation {
                        draft_id: draft_id.clone(),
                        owner: stored.metadata.user_id,
                        actor: user_id.clone(),
                    });
                }
            }
            self.kv.remove(&record_key).await?;
        }

        let LoadedIndex {
            mut entries,
            rebuilt,
        } = self.load_index(user_id).await;
        let before = entries.len();
        entries.retain(|m| m.id != *draft_id);

        if entries.len() != before || rebuilt {
            if let Err(e) = self.write_index(user_id, entries).await {
                self.restore_record(&record_key, stored_raw.as_deref()).await;
                return Err(e);
            }
        }

        debug!(draft_id = %draft_id, user_id = %user_id, "Deleted draft");
        Ok(())
    }

    /// Delete every expired draft of `user_id`. Returns how many were removed.
    pub async fn cleanup_expired_drafts(&self, user_id: &UserId) -> Result<usize, DraftError> {
        let now = Utc::now();
        let LoadedIndex { entries, rebuilt } = self.load_index(user_id).await;

        let (expired, live): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|m| self.policy.is_expired(m, now));

        for metadata in &expired {
            self.kv
                .remove(&self.keys.record_key(user_id, &metadata.id))
                .await?;
        }

        if !expired.is_empty() || rebuilt {
            self.write_index(user_id, live).await?;
        }

        info!(user_id = %user_id, removed = expired.len(), "Expired drafts cleaned up");
        Ok(expired.len())
    }

    /// Serialize a draft to a portable export document.
    pub fn export_draft(&self, draft: &ListingDraft) -> Result<String, DraftError> {
        transfer::export_draft(draft)
    }

    /// Build a new, unsaved draft for `user_id` from an export document.
    pub fn import_draft(&self, json: &str, user_id: &UserId) -> Option<ListingDraft> {
        transfer::import_draft(json, user_id, &self.policy)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> ReadOutcome<T> {
        match self.kv.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => ReadOutcome::Found(value),
                Err(e) => ReadOutcome::Corrupt(format!("invalid JSON: {e}")),
            },
            Ok(None) => ReadOutcome::Missing,
            Err(e) => ReadOutcome::Corrupt(format!("read failed: {e}")),
        }
    }

    /// Best-effort undo of a record write after the index write failed.
    async fn restore_record(&self, record_key: &str, previous: Option<&str>) {
        let restored = match previous {
            Some(raw) => self.kv.set(record_key, raw).await,
            None => self.kv.remove(record_key).await,
        };
        if let Err(e) = restored {
            warn!(key = record_key, error = %e, "Failed to roll back draft record; index may be stale");
        }
    }

    fn note_corrupt(&self, key: &str, reason: &str) {
        self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
        warn!(key, reason, "Unreadable draft data; treating as absent");
    }

    /// Read the user's index, rebuilding it from the records if it is
    /// unreadable.
    async fn load_index(&self, user_id: &UserId) -> LoadedIndex {
        let index_key = self.keys.index_key(user_id);

        match self.read_json::<Vec<DraftMetadata>>(&index_key).await {
            ReadOutcome::Found(entries) => LoadedIndex {
                entries,
                rebuilt: false,
            },
            ReadOutcome::Missing => LoadedIndex {
                entries: Vec::new(),
                rebuilt: false,
            },
            ReadOutcome::Corrupt(reason) => {
                self.note_corrupt(&index_key, &reason);
                LoadedIndex {
                    entries: self.rebuild_index(user_id).await,
                    rebuilt: true,
                }
            }
        }
    }

    /// Reconstruct index entries from the user's stored records.
    async fn rebuild_index(&self, user_id: &UserId) -> Vec<DraftMetadata> {
        let keys = match self
            .kv
            .keys_with_prefix(&self.keys.record_prefix(user_id))
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Cannot list draft records to rebuild index");
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.read_json::<ListingDraft>(key).await {
                ReadOutcome::Found(draft) if draft.metadata.user_id == *user_id => {
                    entries.push(draft.metadata);
                }
                ReadOutcome::Found(_) | ReadOutcome::Missing => {}
                ReadOutcome::Corrupt(reason) => self.note_corrupt(key, &reason),
            }
        }

        sort_newest_first(&mut entries);
        info!(user_id = %user_id, drafts = entries.len(), "Rebuilt draft index from records");
        entries
    }

    async fn write_index(
        &self,
        user_id: &UserId,
        mut entries: Vec<DraftMetadata>,
    ) -> Result<(), DraftError> {
        sort_newest_first(&mut entries);
        let body =
            serde_json::to_string(&entries).map_err(|e| DraftError::Serialization(e.to_string()))?;
        self.kv.set(&self.keys.index_key(user_id), &body).await?;
        Ok(())
    }
}

fn sort_newest_first(entries: &mut [DraftMetadata]) {
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use svetu_types::config::ExpiryMode;
    use svetu_types::draft::DraftImage;

    use svetu_types::error::StorageError;

    use super::*;
    use crate::storage::memory::InMemoryKvStore;

    /// Backend whose writes and removals fail for keys under `fail_prefix`.
    struct FailingWrites {
        inner: InMemoryKvStore,
        fail_prefix: String,
    }

    impl KvStore for FailingWrites {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key.starts_with(&self.fail_prefix) {
                return Err(StorageError::Connection);
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            if key.starts_with(&self.fail_prefix) {
                return Err(StorageError::Connection);
            }
            self.inner.remove(key).await
        }

        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.inner.keys_with_prefix(prefix).await
        }
    }

    fn store() -> (DraftStore<InMemoryKvStore>, InMemoryKvStore) {
        let kv = InMemoryKvStore::new();
        (DraftStore::new(kv.clone()), kv)
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    /// Save a draft, then force its expiry into the past in storage.
    async fn save_expired(store: &DraftStore<InMemoryKvStore>, owner: &UserId) -> ListingDraft {
        let mut draft = store.create_draft(owner);
        draft.metadata.expires_at = Utc::now() - TimeDelta::days(1);
        // Fixed policy: save keeps the supplied expiresAt
        store.save_draft(&mut draft, owner).await.unwrap();
        draft
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut draft = store.create_draft(&u1);
        draft
            .form_data
            .insert("title".to_string(), serde_json::json!("Old bike"));
        store.save_draft(&mut draft, &u1).await.unwrap();

        let loaded = store.get_draft(&draft.metadata.id, &u1).await.unwrap();
        assert_eq!(loaded.form_data["title"], "Old bike");
        assert!(!loaded.metadata.is_complete);

        assert!(store.get_draft(&draft.metadata.id, &user("u2")).await.is_none());
    }

    #[tokio::test]
    async fn test_create_draft_is_not_persisted() {
        let (store, kv) = store();
        let draft = store.create_draft(&user("u1"));
        assert!(kv.is_empty());
        assert!(store.get_draft(&draft.metadata.id, &user("u1")).await.is_none());
    }

    #[tokio::test]
    async fn test_save_get_roundtrip() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut draft = store.create_draft(&u1);
        draft
            .form_data
            .insert("price".to_string(), serde_json::json!(1200));
        draft
            .attributes
            .insert("17".to_string(), serde_json::json!({"value": "red"}));
        draft.images.push(DraftImage {
            id: "img-1".to_string(),
            url: "https://cdn.example/1.jpg".to_string(),
            file: Some(vec![0xff, 0xd8]),
        });
        store.save_draft(&mut draft, &u1).await.unwrap();

        let loaded = store.get_draft(&draft.metadata.id, &u1).await.unwrap();
        assert_eq!(loaded.form_data, draft.form_data);
        assert_eq!(loaded.attributes, draft.attributes);
        assert_eq!(loaded.images, draft.images);
        assert!(loaded.images[0].file.is_none());
    }

    #[tokio::test]
    async fn test_save_refreshes_updated_at_and_version() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut draft = store.create_draft(&u1);
        let created = draft.metadata.updated_at;
        store.save_draft(&mut draft, &u1).await.unwrap();

        assert!(draft.metadata.updated_at >= created);
        assert_eq!(draft.metadata.version, 1);
        assert_eq!(draft.metadata.created_at, created);
    }

    #[tokio::test]
    async fn test_save_rejects_foreign_draft() {
        let (store, kv) = store();
        let mut draft = store.create_draft(&user("u1"));
        let before = draft.metadata.clone();

        let err = store.save_draft(&mut draft, &user("u2")).await.unwrap_err();
        assert!(matches!(err, DraftError::OwnershipViolation { .. }));
        assert!(kv.is_empty());
        assert_eq!(draft.metadata, before);
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let (store, _) = store();
        let u1 = user("u1");
        let u2 = user("u2");

        let mut draft = store.create_draft(&u1);
        store.save_draft(&mut draft, &u1).await.unwrap();

        assert!(store.get_draft(&draft.metadata.id, &u2).await.is_none());
        assert!(store.get_drafts_list(&u2).await.is_empty());
        assert_eq!(store.get_drafts_list(&u1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut first = store.create_draft(&u1);
        store.save_draft(&mut first, &u1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut second = store.create_draft(&u1);
        store.save_draft(&mut second, &u1).await.unwrap();

        let list = store.get_drafts_list(&u1).await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.metadata.id);
        assert_eq!(list[1].id, first.metadata.id);

        // Re-saving the older draft moves it to the front without duplicating it
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save_draft(&mut first, &u1).await.unwrap();
        let list = store.get_drafts_list(&u1).await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first.metadata.id);
    }

    #[tokio::test]
    async fn test_expired_draft_removed_on_read() {
        let (store, kv) = store();
        let u1 = user("u1");
        let draft = save_expired(&store, &u1).await;
        let record_key = store.keys().record_key(&u1, &draft.metadata.id);

        assert!(store.get_drafts_list(&u1).await.is_empty());
        // Listing does not sweep
        assert!(kv.get(&record_key).await.unwrap().is_some());

        assert!(store.get_draft(&draft.metadata.id, &u1).await.is_none());
        assert!(kv.get(&record_key).await.unwrap().is_none());

        let index = kv.get(&store.keys().index_key(&u1)).await.unwrap().unwrap();
        let entries: Vec<DraftMetadata> = serde_json::from_str(&index).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, kv) = store();
        let u1 = user("u1");

        let mut keep = store.create_draft(&u1);
        store.save_draft(&mut keep, &u1).await.unwrap();
        let mut gone = store.create_draft(&u1);
        store.save_draft(&mut gone, &u1).await.unwrap();

        store.delete_draft(&gone.metadata.id, &u1).await.unwrap();
        let after_first = store.get_drafts_list(&u1).await;
        let keys_after_first = kv.len();

        store.delete_draft(&gone.metadata.id, &u1).await.unwrap();
        assert_eq!(store.get_drafts_list(&u1).await, after_first);
        assert_eq!(kv.len(), keys_after_first);
        assert_eq!(after_first.len(), 1);
        assert_eq!(after_first[0].id, keep.metadata.id);
    }

    #[tokio::test]
    async fn test_delete_unknown_user_writes_nothing() {
        let (store, kv) = store();
        store
            .delete_draft(&DraftId::from("missing"), &user("nobody"))
            .await
            .unwrap();
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_index_consistency() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut ids = Vec::new();
        for _ in 0..5 {
            let mut draft = store.create_draft(&u1);
            store.save_draft(&mut draft, &u1).await.unwrap();
            ids.push(draft.metadata.id.clone());
        }
        store.delete_draft(&ids[1], &u1).await.unwrap();
        store.delete_draft(&ids[3], &u1).await.unwrap();

        let mut listed: Vec<DraftId> = store
            .get_drafts_list(&u1)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();
        listed.sort();
        let mut expected = vec![ids[0].clone(), ids[2].clone(), ids[4].clone()];
        expected.sort();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_cleanup_expired_drafts() {
        let (store, kv) = store();
        let u1 = user("u1");

        let mut live = store.create_draft(&u1);
        store.save_draft(&mut live, &u1).await.unwrap();
        let a = save_expired(&store, &u1).await;
        let b = save_expired(&store, &u1).await;

        assert_eq!(store.cleanup_expired_drafts(&u1).await.unwrap(), 2);
        assert!(kv.get(&store.keys().record_key(&u1, &a.metadata.id)).await.unwrap().is_none());
        assert!(kv.get(&store.keys().record_key(&u1, &b.metadata.id)).await.unwrap().is_none());

        let list = store.get_drafts_list(&u1).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, live.metadata.id);

        assert_eq!(store.cleanup_expired_drafts(&u1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_absent() {
        let (store, kv) = store();
        let u1 = user("u1");
        let id = DraftId::from("broken");
        kv.set(&store.keys().record_key(&u1, &id), "{not json")
            .await
            .unwrap();

        assert!(store.get_draft(&id, &u1).await.is_none());
        assert_eq!(store.corrupt_reads(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_index_rebuilt_from_records() {
        let (store, kv) = store();
        let u1 = user("u1");

        let mut a = store.create_draft(&u1);
        store.save_draft(&mut a, &u1).await.unwrap();
        let mut b = store.create_draft(&u1);
        store.save_draft(&mut b, &u1).await.unwrap();

        kv.set(&store.keys().index_key(&u1), "garbage").await.unwrap();

        let list = store.get_drafts_list(&u1).await;
        assert_eq!(list.len(), 2);
        assert!(store.corrupt_reads() >= 1);

        // The next save writes a clean index that still holds both drafts
        let mut c = store.create_draft(&u1);
        store.save_draft(&mut c, &u1).await.unwrap();
        let raw = kv.get(&store.keys().index_key(&u1)).await.unwrap().unwrap();
        let entries: Vec<DraftMetadata> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_rebuild_ignores_prefix_sibling_user() {
        let (store, kv) = store();
        let u1 = user("u1");
        let sibling = user("u1_x");

        let mut theirs = store.create_draft(&sibling);
        store.save_draft(&mut theirs, &sibling).await.unwrap();
        kv.set(&store.keys().index_key(&u1), "garbage").await.unwrap();

        assert!(store.get_drafts_list(&u1).await.is_empty());
    }

    #[tokio::test]
    async fn test_extended_user_id_cannot_reach_other_users_drafts() {
        let (store, _) = store();
        let owner = user("u1_x");
        let other = user("u1");

        let mut theirs = store.create_draft(&owner);
        store.save_draft(&mut theirs, &owner).await.unwrap();

        // Same concatenated text as the owner's record under the old layout
        let mut mine = store.create_draft(&other);
        mine.metadata.id = DraftId::from(format!("x_{}", theirs.metadata.id));
        store.save_draft(&mut mine, &other).await.unwrap();
        store.delete_draft(&mine.metadata.id, &other).await.unwrap();

        let loaded = store.get_draft(&theirs.metadata.id, &owner).await;
        assert_eq!(loaded.map(|d| d.metadata.version), Some(1));
        assert_eq!(store.get_drafts_list(&owner).await.len(), 1);
        assert!(store.get_drafts_list(&other).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_delete_refuse_record_owned_by_another_user() {
        let (store, kv) = store();
        let u1 = user("u1");
        let u2 = user("u2");

        // A record under u1's key that belongs to u2, e.g. from hand-edited storage
        let mut foreign = store.create_draft(&u2);
        foreign.metadata.version = 1;
        let record_key = store.keys().record_key(&u1, &foreign.metadata.id);
        kv.set(&record_key, &serde_json::to_string(&foreign).unwrap())
            .await
            .unwrap();

        let mut mine = store.create_draft(&u1);
        mine.metadata.id = foreign.metadata.id.clone();
        let err = store.save_draft(&mut mine, &u1).await.unwrap_err();
        assert!(matches!(err, DraftError::OwnershipViolation { ref owner, .. } if *owner == u2));

        let err = store.delete_draft(&foreign.metadata.id, &u1).await.unwrap_err();
        assert!(matches!(err, DraftError::OwnershipViolation { .. }));
        assert!(kv.get(&record_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_index_write_restores_record() {
        let kv = InMemoryKvStore::new();
        let config = DraftConfig {
            optimistic_locking: true,
            ..DraftConfig::default()
        };
        let healthy = DraftStore::with_config(kv.clone(), &config);
        let u1 = user("u1");

        let mut draft = healthy.create_draft(&u1);
        draft.metadata.title = Some("first".to_string());
        healthy.save_draft(&mut draft, &u1).await.unwrap();
        let record_key = healthy.keys().record_key(&u1, &draft.metadata.id);
        let saved = kv.get(&record_key).await.unwrap();

        let failing = DraftStore::with_config(
            FailingWrites {
                inner: kv.clone(),
                fail_prefix: healthy.keys().index_key(&u1),
            },
            &config,
        );

        draft.metadata.title = Some("second".to_string());
        let err = failing.save_draft(&mut draft, &u1).await.unwrap_err();
        assert!(matches!(err, DraftError::Storage(_)));
        assert_eq!(draft.metadata.version, 1);
        assert_eq!(kv.get(&record_key).await.unwrap(), saved);

        // A new draft leaves no record without an index entry
        let mut fresh = failing.create_draft(&u1);
        assert!(failing.save_draft(&mut fresh, &u1).await.is_err());
        let fresh_key = healthy.keys().record_key(&u1, &fresh.metadata.id);
        assert!(kv.get(&fresh_key).await.unwrap().is_none());

        // Retrying the same draft is not a conflict with itself
        healthy.save_draft(&mut draft, &u1).await.unwrap();
        assert_eq!(draft.metadata.version, 2);
    }

    #[tokio::test]
    async fn test_failed_index_write_on_delete_keeps_record() {
        let kv = InMemoryKvStore::new();
        let healthy = DraftStore::new(kv.clone());
        let u1 = user("u1");

        let mut draft = healthy.create_draft(&u1);
        healthy.save_draft(&mut draft, &u1).await.unwrap();

        let failing = DraftStore::new(FailingWrites {
            inner: kv.clone(),
            fail_prefix: healthy.keys().index_key(&u1),
        });
        assert!(failing.delete_draft(&draft.metadata.id, &u1).await.is_err());

        assert!(healthy.get_draft(&draft.metadata.id, &u1).await.is_some());
        assert_eq!(healthy.get_drafts_list(&u1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_sliding_expiry_extends_on_save() {
        let config = DraftConfig {
            expiry_mode: ExpiryMode::Sliding,
            ..DraftConfig::default()
        };
        let store = DraftStore::with_config(InMemoryKvStore::new(), &config);
        let u1 = user("u1");

        let mut draft = store.create_draft(&u1);
        draft.metadata.expires_at = Utc::now() + TimeDelta::hours(1);
        store.save_draft(&mut draft, &u1).await.unwrap();

        assert!(draft.metadata.expires_at > Utc::now() + TimeDelta::days(29));
    }

    #[tokio::test]
    async fn test_last_write_wins_by_default() {
        let (store, _) = store();
        let u1 = user("u1");

        let mut tab_a = store.create_draft(&u1);
        store.save_draft(&mut tab_a, &u1).await.unwrap();
        let mut tab_b = tab_a.clone();

        tab_a.metadata.title = Some("from a".to_string());
        store.save_draft(&mut tab_a, &u1).await.unwrap();
        tab_b.metadata.title = Some("from b".to_string());
        store.save_draft(&mut tab_b, &u1).await.unwrap();

        let loaded = store.get_draft(&tab_a.metadata.id, &u1).await.unwrap();
        assert_eq!(loaded.metadata.title.as_deref(), Some("from b"));
    }

    #[tokio::test]
    async fn test_optimistic_locking_rejects_stale_save() {
        let config = DraftConfig {
            optimistic_locking: true,
            ..DraftConfig::default()
        };
        let store = DraftStore::with_config(InMemoryKvStore::new(), &config);
        let u1 = user("u1");

        let mut tab_a = store.create_draft(&u1);
        store.save_draft(&mut tab_a, &u1).await.unwrap();
        let mut tab_b = tab_a.clone();

        store.save_draft(&mut tab_a, &u1).await.unwrap();
        let err = store.save_draft(&mut tab_b, &u1).await.unwrap_err();
        match err {
            DraftError::VersionConflict { expected, actual, .. } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected version conflict, got {other:?}"),
        }
        assert_eq!(tab_b.metadata.version, 1);
    }

    #[tokio::test]
    async fn test_custom_prefix_used_for_keys() {
        let config = DraftConfig {
            key_prefix: "demo_draft".to_string(),
            ..DraftConfig::default()
        };
        let kv = InMemoryKvStore::new();
        let store = DraftStore::with_config(kv.clone(), &config);
        let u1 = user("u1");

        let mut draft = store.create_draft(&u1);
        store.save_draft(&mut draft, &u1).await.unwrap();

        let keys = kv.keys_with_prefix("demo_draft").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
