//! Acting-user extractor.
//!
//! Authentication happens upstream; the gateway forwards the signed-in
//! user's id in `X-User-Id`. Every draft route needs it, because drafts are
//! only visible to their owner.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use svetu_types::draft::UserId;

use crate::http::error::AppError;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
pub struct ActingUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_from_headers(&parts.headers).map(ActingUser)
    }
}

fn user_from_headers(headers: &HeaderMap) -> Result<UserId, AppError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Err(AppError::Unauthorized(
            "Missing acting user. Provide it via the 'X-User-Id' header.".to_string(),
        ));
    };

    let id = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?
        .trim();
    if id.is_empty() {
        return Err(AppError::Unauthorized("Empty X-User-Id header".to_string()));
    }

    Ok(UserId::from(id))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_reads_trimmed_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(user_from_headers(&headers).unwrap(), UserId::from(42));
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = user_from_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_blank_header_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(matches!(
            user_from_headers(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }
}
