use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::optional_text;
use crate::db::queries;
use crate::errors::AppError;
use crate::services::session;
use crate::state::AppState;

// GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let profile =
        queries::get_profile(&conn, &user.id)?.ok_or_else(|| AppError::not_found("Profile"))?;

    Ok(Json(json!({ "profile": profile })))
}

// PATCH /api/profile
#[derive(Deserialize)]
pub struct ProfileUpdate {
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let mut profile =
        queries::get_profile(&conn, &user.id)?.ok_or_else(|| AppError::not_found("Profile"))?;

    if let Some(first) = body.first_name {
        let first = first.trim();
        if first.is_empty() {
            return Err(AppError::bad_request("First name cannot be empty"));
        }
        profile.first_name = first.to_string();
    }
    if let Some(last) = body.last_name {
        let last = last.trim();
        if last.is_empty() {
            return Err(AppError::bad_request("Last name cannot be empty"));
        }
        profile.last_name = last.to_string();
    }

    // Present-but-blank clears the field
    if body.phone.is_some() {
        profile.phone = optional_text(body.phone);
    }
    if body.bio.is_some() {
        profile.bio = optional_text(body.bio);
    }
    if body.city.is_some() {
        profile.city = optional_text(body.city);
    }
    if body.state.is_some() {
        profile.state = optional_text(body.state);
    }
    if body.avatar_url.is_some() {
        profile.avatar_url = optional_text(body.avatar_url);
    }

    profile.updated_at = queries::now();
    if !queries::update_profile(&conn, &profile)? {
        return Err(AppError::not_found("Profile"));
    }

    tracing::info!(user_id = %profile.id, "profile updated");

    Ok(Json(json!({ "profile": profile })))
}
