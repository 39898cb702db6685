//! Storage key scheme for drafts.
//!
//! Records live under `{prefix}_{user}_{draft}`, and each user has one
//! index under `{prefix}s_list_{user}`. `_` separates segments, so a `_` or
//! `\` inside a user or draft id is backslash-escaped. Ids without either
//! character map to the plain layout.

use svetu_types::draft::{DraftId, UserId};

/// Builds the per-user keys for draft records and the draft index.
#[derive(Debug, Clone)]
pub struct DraftKeys {
    prefix: String,
}

impl DraftKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Key of a single draft record.
    pub fn record_key(&self, user_id: &UserId, draft_id: &DraftId) -> String {
        format!(
            "{}_{}_{}",
            self.prefix,
            escape_segment(user_id.as_str()),
            escape_segment(draft_id.as_str())
        )
    }

    /// Prefix shared by every record key of `user_id`, and by no other
    /// user's keys.
    pub fn record_prefix(&self, user_id: &UserId) -> String {
        format!("{}_{}_", self.prefix, escape_segment(user_id.as_str()))
    }

    /// Key of the user's draft index.
    pub fn index_key(&self, user_id: &UserId) -> String {
        format!("{}s_list_{}", self.prefix, escape_segment(user_id.as_str()))
    }
}

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Default for DraftKeys {
    fn default() -> Self {
        Self::new("listing_draft")
    }
}
