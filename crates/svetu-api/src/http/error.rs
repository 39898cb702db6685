//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use svetu_types::error::DraftError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Draft store errors.
    Draft(DraftError),
    /// Draft absent, expired, unreadable, or owned by someone else.
    NotFound(String),
    /// No usable acting user on the request.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
}

impl From<DraftError> for AppError {
    fn from(e: DraftError) -> Self {
        AppError::Draft(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Draft(e @ DraftError::OwnershipViolation { .. }) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
            }
            AppError::Draft(e @ DraftError::VersionConflict { .. }) => {
                (StatusCode::CONFLICT, "VERSION_CONFLICT", e.to_string())
            }
            AppError::Draft(e) => (StatusCode::INTERNAL_SERVER_ERROR, "DRAFT_ERROR", e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "DRAFT_NOT_FOUND", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use svetu_types::draft::{DraftId, UserId};
    use svetu_types::error::StorageError;

    use super::*;

    #[test]
    fn test_ownership_violation_is_forbidden() {
        let err = AppError::from(DraftError::OwnershipViolation {
            draft_id: DraftId::from("d1"),
            owner: UserId::from("u1"),
            actor: UserId::from("u2"),
        });
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_version_conflict_is_conflict() {
        let err = AppError::from(DraftError::VersionConflict {
            draft_id: DraftId::from("d1"),
            expected: 1,
            actual: 2,
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_failure_is_server_error() {
        let err = AppError::from(DraftError::from(StorageError::Connection));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_plain_variants_map_to_status() {
        assert_eq!(
            AppError::NotFound("gone".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("who".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
