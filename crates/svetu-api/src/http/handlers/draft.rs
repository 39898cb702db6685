//! Listing draft handlers for the REST API.
//!
//! The web wizard autosaves through `PUT /drafts/{id}` and resumes through
//! `GET /drafts`. Reads that find nothing (absent, expired, unreadable, or
//! another user's draft) answer 404 without saying which.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use svetu_types::draft::{CategorySummary, DraftId, DraftMetadata, ListingDraft};

use crate::http::error::AppError;
use crate::http::extractors::user::ActingUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /drafts`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDraftRequest {
    pub title: Option<String>,
    pub current_step: Option<u32>,
    pub category: Option<CategorySummary>,
    pub form_data: serde_json::Map<String, serde_json::Value>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

fn draft_href(id: &DraftId) -> String {
    format!("/api/v1/drafts/{id}")
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// GET /api/v1/drafts - List the acting user's live drafts, newest first.
pub async fn list_drafts(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<ApiResponse<Vec<DraftMetadata>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let drafts = state.drafts.get_drafts_list(&user).await;

    Ok(ApiResponse::success(drafts, request_id, elapsed_ms(start)).with_link("self", "/api/v1/drafts"))
}

/// POST /api/v1/drafts - Start a new draft and save it.
pub async fn create_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(body): Json<CreateDraftRequest>,
) -> Result<ApiResponse<ListingDraft>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let mut draft = state.drafts.create_draft(&user);
    if let Some(step) = body.current_step {
        draft.metadata.current_step = step;
    }
    draft.metadata.category = body.category;
    draft.form_data = body.form_data;
    draft.attributes = body.attributes;
    if let Some(title) = body.title {
        draft
            .form_data
            .insert("title".to_string(), serde_json::Value::String(title.clone()));
        draft.metadata.title = Some(title);
    }

    state.drafts.save_draft(&mut draft, &user).await?;
    let href = draft_href(&draft.metadata.id);

    Ok(ApiResponse::success(draft, request_id, elapsed_ms(start))
        .with_status(StatusCode::CREATED)
        .with_link("self", &href)
        .with_link("export", &format!("{href}/export")))
}

/// GET /api/v1/drafts/{id} - Load one draft.
pub async fn get_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ListingDraft>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = DraftId::from(id);

    let draft = state
        .drafts
        .get_draft(&id, &user)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Draft '{id}' not found")))?;

    Ok(ApiResponse::success(draft, request_id, elapsed_ms(start)).with_link("self", &draft_href(&id)))
}

/// PUT /api/v1/drafts/{id} - Save (autosave) a full draft.
///
/// Returns the draft as stored, with refreshed `updatedAt` and `version`.
pub async fn save_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(mut draft): Json<ListingDraft>,
) -> Result<ApiResponse<ListingDraft>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if draft.metadata.id.as_str() != id {
        return Err(AppError::Validation(format!(
            "Path id '{id}' does not match draft id '{}'",
            draft.metadata.id
        )));
    }

    state.drafts.save_draft(&mut draft, &user).await?;
    let href = draft_href(&draft.metadata.id);

    Ok(ApiResponse::success(draft, request_id, elapsed_ms(start)).with_link("self", &href))
}

/// DELETE /api/v1/drafts/{id} - Delete a draft. Deleting a missing draft succeeds.
pub async fn delete_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();
    let id = DraftId::from(id);

    state.drafts.delete_draft(&id, &user).await?;

    Ok(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
        request_id,
        elapsed_ms(start),
    ))
}

/// GET /api/v1/drafts/{id}/export - Download a draft as an export document.
///
/// Answers with the raw document rather than the envelope, so the file can
/// be imported as-is.
pub async fn export_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = DraftId::from(id);

    let draft = state
        .drafts
        .get_draft(&id, &user)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Draft '{id}' not found")))?;
    let document = state.drafts.export_draft(&draft)?;

    let disposition = format!("attachment; filename=\"draft-{id}.json\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document,
    )
        .into_response())
}

/// POST /api/v1/drafts/import - Import an export document as a new draft.
///
/// The body is the raw document. The imported draft gets a fresh id and
/// TTL and belongs to the acting user.
pub async fn import_draft(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    body: String,
) -> Result<ApiResponse<ListingDraft>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let mut draft = state
        .drafts
        .import_draft(&body, &user)
        .ok_or_else(|| AppError::Validation("Body is not a supported draft export".to_string()))?;
    state.drafts.save_draft(&mut draft, &user).await?;
    let href = draft_href(&draft.metadata.id);

    Ok(ApiResponse::success(draft, request_id, elapsed_ms(start))
        .with_status(StatusCode::CREATED)
        .with_link("self", &href))
}

/// POST /api/v1/drafts/cleanup - Delete the acting user's expired drafts.
pub async fn cleanup_drafts(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let removed = state.drafts.cleanup_expired_drafts(&user).await?;

    Ok(ApiResponse::success(
        serde_json::json!({ "removed": removed }),
        request_id,
        elapsed_ms(start),
    ))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use svetu_core::storage::memory::InMemoryKvStore;
    use svetu_types::draft::UserId;

    use super::*;
    use crate::state::AppKvStore;

    fn test_state() -> AppState {
        AppState::from_parts(
            AppKvStore::Memory(InMemoryKvStore::new()),
            Default::default(),
            PathBuf::from("."),
        )
    }

    fn user(id: &str) -> ActingUser {
        ActingUser(UserId::from(id))
    }

    async fn create(state: &AppState, owner: &str, title: &str) -> ListingDraft {
        let body = CreateDraftRequest {
            title: Some(title.to_string()),
            ..Default::default()
        };
        create_draft(State(state.clone()), user(owner), Json(body))
            .await
            .unwrap()
            .data
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;
        assert_eq!(draft.metadata.title.as_deref(), Some("Old bike"));
        assert_eq!(draft.form_data["title"], "Old bike");

        let listed = list_drafts(State(state.clone()), user("u1")).await.unwrap().data;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, draft.metadata.id);

        let other = list_drafts(State(state), user("u2")).await.unwrap().data;
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_get_other_users_draft_is_not_found() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;

        let result = get_draft(State(state), user("u2"), Path(draft.metadata.id.0.clone())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_rejects_mismatched_path_id() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;

        let result = save_draft(State(state), user("u1"), Path("other".to_string()), Json(draft)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_save_by_non_owner_is_forbidden() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;
        let id = draft.metadata.id.0.clone();

        let err = save_draft(State(state), user("u2"), Path(id), Json(draft))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_export_then_import_creates_new_draft() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;

        let response = export_draft(State(state.clone()), user("u1"), Path(draft.metadata.id.0.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::CONTENT_DISPOSITION));

        let document = state.drafts.export_draft(&draft).unwrap();
        let imported = import_draft(State(state.clone()), user("u2"), document)
            .await
            .unwrap()
            .data;
        assert_ne!(imported.metadata.id, draft.metadata.id);
        assert_eq!(imported.metadata.user_id, UserId::from("u2"));
        assert_eq!(imported.form_data, draft.form_data);
    }

    #[tokio::test]
    async fn test_import_garbage_is_validation_error() {
        let state = test_state();
        let result = import_draft(State(state), user("u1"), "not json".to_string()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let state = test_state();
        let draft = create(&state, "u1", "Old bike").await;
        let id = draft.metadata.id.0.clone();

        delete_draft(State(state.clone()), user("u1"), Path(id.clone())).await.unwrap();
        delete_draft(State(state.clone()), user("u1"), Path(id)).await.unwrap();
        assert!(list_drafts(State(state), user("u1")).await.unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_reports_count() {
        let state = test_state();
        create(&state, "u1", "Fresh").await;

        let body = cleanup_drafts(State(state), user("u1")).await.unwrap().data;
        assert_eq!(body["removed"], 0);
    }
}
