use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

use crate::errors::AppError;
use crate::services::auth::AuthUser;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sb-access-token";

/// Pulls the access token from `Authorization: Bearer` or the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = access_token(headers).ok_or_else(AppError::unauthenticated)?;

    match state.identity.get_user(&token).await? {
        Some(user) => Ok(user),
        None => {
            tracing::debug!("access token rejected by identity provider");
            Err(AppError::unauthenticated())
        }
    }
}
