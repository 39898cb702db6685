//! Draft retention policy.
//!
//! A draft lives for a fixed TTL (30 days by default). Expiry is enforced
//! lazily by the store's read paths and by an explicit cleanup sweep;
//! nothing runs in the background.

use chrono::{DateTime, TimeDelta, Utc};
use svetu_types::config::{DraftConfig, ExpiryMode};
use svetu_types::draft::{DraftId, DraftMetadata, ListingDraft, UserId};

/// Shortest TTL accepted from configuration.
const MIN_TTL_DAYS: u32 = 1;

/// TTL and expiry mode applied to every draft in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    ttl: TimeDelta,
    mode: ExpiryMode,
}

impl LifecyclePolicy {
    pub fn new(ttl: TimeDelta, mode: ExpiryMode) -> Self {
        Self { ttl, mode }
    }

    /// Build the policy from the `[drafts]` config section.
    ///
    /// `ttl_days` below one day is raised to one day.
    pub fn from_config(config: &DraftConfig) -> Self {
        let days = config.ttl_days.max(MIN_TTL_DAYS);
        Self::new(TimeDelta::days(i64::from(days)), config.expiry_mode)
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn mode(&self) -> ExpiryMode {
        self.mode
    }

    /// Expiry instant for a draft created (or imported) at `now`.
    pub fn expires_at_for(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }

    /// Whether `now` is past the draft's expiry.
    pub fn is_expired(&self, metadata: &DraftMetadata, now: DateTime<Utc>) -> bool {
        now > metadata.expires_at
    }

    /// Stamp a save at `now`: refresh `updatedAt`, and slide `expiresAt`
    /// when the policy is sliding.
    pub fn touch(&self, metadata: &mut DraftMetadata, now: DateTime<Utc>) {
        metadata.updated_at = now;
        if self.mode == ExpiryMode::Sliding {
            metadata.expires_at = self.expires_at_for(now);
        }
    }

    /// A blank draft owned by `user_id`, started at `now`.
    pub fn new_draft(&self, user_id: UserId, now: DateTime<Utc>) -> ListingDraft {
        ListingDraft {
            metadata: DraftMetadata {
                id: DraftId::new(),
                user_id,
                created_at: now,
                updated_at: now,
                current_step: 1,
                category: None,
                title: None,
                is_complete: false,
                expires_at: self.expires_at_for(now),
                imported_at: None,
                version: 0,
            },
            form_data: serde_json::Map::new(),
            attributes: Default::default(),
            images: Vec::new(),
        }
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::from_config(&DraftConfig::default())
    }
}
