//! Draft export and import.
//!
//! Export writes the full draft plus `exportedAt` and a format `version`
//! tag. Import never restores the original identity: the draft gets a new
//! id, belongs to whoever imports it, and starts a fresh TTL. Neither side
//! touches storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use svetu_types::draft::{DraftExport, EXPORT_FORMAT_VERSION, ListingDraft, UserId};
use svetu_types::error::DraftError;
use tracing::{debug, warn};

use super::lifecycle::LifecyclePolicy;

/// Borrowed view of the export document, so exporting does not clone the draft.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportView<'a> {
    #[serde(flatten)]
    draft: &'a ListingDraft,
    exported_at: DateTime<Utc>,
    version: &'static str,
}

/// Serialize `draft` into a pretty-printed export document.
pub fn export_draft(draft: &ListingDraft) -> Result<String, DraftError> {
    let view = ExportView {
        draft,
        exported_at: Utc::now(),
        version: EXPORT_FORMAT_VERSION,
    };
    serde_json::to_string_pretty(&view).map_err(|e| DraftError::Serialization(e.to_string()))
}

/// Build a new, unsaved draft for `user_id` from an export document.
///
/// Any JSON object imports; missing or misshapen content fields fall back
/// to their defaults. Returns `None` if `json` is not a JSON object, or if
/// it carries a format version with a major other than 1. A missing version
/// tag is accepted.
pub fn import_draft(json: &str, user_id: &UserId, policy: &LifecyclePolicy) -> Option<ListingDraft> {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Rejected draft import: not JSON");
            return None;
        }
    };
    if !value.is_object() {
        warn!("Rejected draft import: document is not a JSON object");
        return None;
    }

    let document: DraftExport = match serde_json::from_value(value) {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, "Rejected draft import: unreadable document");
            return None;
        }
    };

    if let Some(version) = &document.version {
        if !is_supported_tag(version) {
            warn!(version = %version, "Rejected draft import: unsupported format version");
            return None;
        }
    }

    let now = Utc::now();
    let source = document.metadata;
    let mut draft = policy.new_draft(user_id.clone(), now);

    if let Some(step) = source.current_step {
        draft.metadata.current_step = step;
    }
    draft.metadata.category = source.category;
    draft.metadata.title = source.title;
    draft.metadata.is_complete = source.is_complete;
    draft.metadata.imported_at = Some(now);
    draft.form_data = document.form_data;
    draft.attributes = document.attributes;
    draft.images = document.images;

    debug!(draft_id = %draft.metadata.id, user_id = %user_id, "Imported draft");
    Some(draft)
}

fn is_supported_tag(tag: &serde_json::Value) -> bool {
    match tag {
        serde_json::Value::Null => true,
        serde_json::Value::String(version) => is_supported_version(version),
        serde_json::Value::Number(version) => is_supported_version(&version.to_string()),
        _ => false,
    }
}

fn is_supported_version(version: &str) -> bool {
    version.trim().split('.').next() == Some("1")
}
