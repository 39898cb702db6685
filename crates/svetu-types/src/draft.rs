//! Listing draft types.
//!
//! A draft is an in-progress, not-yet-published marketplace listing. The
//! JSON shape of [`ListingDraft`] is the compatibility surface shared with
//! the web frontend, so field names are camelCase. [`DraftExport`] reads
//! export files back and tolerates anything it does not need.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Format tag written into every exported draft document.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Opaque draft identifier.
///
/// New drafts get a UUID v7 rendered as text. Ids coming from older export
/// files are kept verbatim, so this wraps a string rather than a `Uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub String);

impl DraftId {
    /// Generate a fresh, time-sortable draft id.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DraftId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DraftId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the user who owns a draft.
///
/// The frontend's auth context hands out either numeric or string ids, so
/// deserialization accepts both. Internally the id is always text, which
/// makes `"42"` and `42` the same owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawUserId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawUserId::deserialize(deserializer)? {
            RawUserId::Text(s) => Self(s),
            RawUserId::Number(n) => Self(n.to_string()),
        })
    }
}

/// Denormalized summary of the listing category picked in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Numeric on the wire, but older exports carry it as a string.
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Lightweight descriptor of a draft, kept in the per-user index.
///
/// Avoids loading `formData`/`attributes`/`images` when only a list of
/// drafts is needed (e.g., the "resume a draft" modal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    pub id: DraftId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every save.
    pub updated_at: DateTime<Utc>,
    /// Wizard step the user was on (1-based).
    #[serde(default = "default_step")]
    pub current_step: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategorySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Set by the listing form once every required field is filled.
    #[serde(default)]
    pub is_complete: bool,
    /// After this instant the draft is treated as non-existent.
    pub expires_at: DateTime<Utc>,
    /// Present only on drafts produced by an import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    /// Save counter, used for optimistic conflict detection.
    #[serde(default)]
    pub version: u64,
}

fn default_step() -> u32 {
    1
}

/// An image attached to a draft.
///
/// `file` holds the raw upload while the form is open. It is never
/// persisted, and equality ignores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftImage {
    pub id: String,
    pub url: String,
    #[serde(skip)]
    pub file: Option<Vec<u8>>,
}

impl PartialEq for DraftImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.url == other.url
    }
}

/// Full draft record as persisted under its per-user key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub metadata: DraftMetadata,
    /// Partial listing fields (title, description, price, ...). Shape is
    /// owned by the listing form.
    #[serde(default)]
    pub form_data: serde_json::Map<String, serde_json::Value>,
    /// Attribute id to value.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub images: Vec<DraftImage>,
}

/// An export document as read back on import.
///
/// Import rebuilds identity, ownership and timestamps, so only content
/// fields are read. Every field is optional, and a field of the wrong shape
/// reads as its default instead of failing the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftExport {
    #[serde(deserialize_with = "lenient")]
    pub metadata: ExportedMetadata,
    #[serde(deserialize_with = "lenient")]
    pub form_data: serde_json::Map<String, serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub images: Vec<DraftImage>,
    /// Format tag, normally `"1.0"`. Kept raw so the caller decides what
    /// counts as supported.
    pub version: Option<serde_json::Value>,
}

/// The metadata fields an import carries over.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportedMetadata {
    #[serde(deserialize_with = "lenient")]
    pub current_step: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<CategorySummary>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub is_complete: bool,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn number_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
