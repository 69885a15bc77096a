//! Caller extraction from the headers set by the upstream session layer.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::{Caller, UserId, UserRole};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const ACCOUNT_FROZEN_HEADER: &str = "x-account-frozen";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityRejection {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("unrecognized role `{0}`")]
    UnknownRole(String),
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "code": "UNAUTHENTICATED",
        });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, IdentityRejection> {
    let user_id = header_text(headers, USER_ID_HEADER)
        .ok_or(IdentityRejection::MissingHeader(USER_ID_HEADER))?;
    let raw_role = header_text(headers, USER_ROLE_HEADER)
        .ok_or(IdentityRejection::MissingHeader(USER_ROLE_HEADER))?;
    let role =
        UserRole::parse(raw_role).ok_or_else(|| IdentityRejection::UnknownRole(raw_role.to_string()))?;
    let is_frozen = header_text(headers, ACCOUNT_FROZEN_HEADER)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false);

    Ok(Caller {
        user_id: UserId(user_id.to_string()),
        role,
        is_frozen,
    })
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}
