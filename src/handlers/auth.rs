use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{number, optional_text, present};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AccountStatus, Profile, Role};
use crate::services::auth::IdentityError;
use crate::services::session::{self, SESSION_COOKIE};
use crate::state::AppState;

const MIN_AGE: f64 = 13.0;
const MAX_AGE: f64 = 19.0;
const MIN_PASSWORD_LEN: usize = 8;

// POST /api/auth/signup
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    pub age: Option<Value>,
    pub role: Option<String>,
    #[serde(alias = "parentEmail")]
    pub parent_email: Option<String>,
    #[serde(alias = "parentPhone")]
    pub parent_phone: Option<String>,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(email), Some(password), Some(first_name), Some(last_name), Some(age)) = (
        present(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
        present(&body.first_name),
        present(&body.last_name),
        number(body.age.as_ref()),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    if !(MIN_AGE..=MAX_AGE).contains(&age) || age.fract() != 0.0 {
        return Err(AppError::bad_request("Age must be between 13 and 19"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters long",
        ));
    }
    let role = match present(&body.role) {
        Some(r) => Role::parse(r).ok_or_else(|| AppError::bad_request("Invalid role"))?,
        None => Role::Teen,
    };

    let email = email.to_lowercase();
    {
        let conn = state.db()?;
        if queries::get_profile_by_email(&conn, &email)?.is_some() {
            return Err(AppError::bad_request(
                "An account with this email already exists",
            ));
        }
    }

    let user = state.identity.sign_up(&email, password).await?;

    let ts = queries::now();
    let profile = Profile {
        id: user.id.clone(),
        email: email.clone(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role,
        status: AccountStatus::Active,
        age: Some(age as i32),
        parent_email: optional_text(body.parent_email),
        parent_phone: optional_text(body.parent_phone),
        phone: None,
        bio: None,
        city: None,
        state: None,
        avatar_url: None,
        is_verified: false,
        created_at: ts,
        updated_at: ts,
    };

    {
        let conn = state.db()?;
        queries::insert_profile(&conn, &profile)?;
    }

    tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "account created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully",
            "user": {
                "id": profile.id,
                "email": profile.email,
                "first_name": profile.first_name,
                "last_name": profile.last_name,
            },
        })),
    ))
}

// POST /api/auth/signin
#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn signin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SigninRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let (Some(email), Some(password)) = (
        present(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("Email and password are required"));
    };

    let session = match state.identity.sign_in(&email.to_lowercase(), password).await {
        Ok(session) => session,
        Err(IdentityError::Rejected(msg)) => return Err(AppError::Unauthenticated(msg)),
        Err(e) => return Err(e.into()),
    };

    let profile = {
        let conn = state.db()?;
        queries::get_profile(&conn, &session.user.id)?
    }
    .ok_or_else(|| AppError::not_found("Profile"))?;

    if profile.status != AccountStatus::Active {
        tracing::warn!(user_id = %profile.id, status = profile.status.as_str(), "sign-in refused");
        return Err(AppError::Forbidden(
            "Account is not active. Please contact support.".to_string(),
        ));
    }

    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, session.access_token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );

    tracing::info!(user_id = %profile.id, "signed in");

    Ok((
        jar,
        Json(json!({
            "message": "Signed in successfully",
            "user": profile,
            "session": session,
        })),
    ))
}

// POST /api/auth/signout
pub async fn signout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AppError> {
    if let Some(token) = session::access_token(&headers) {
        if let Err(e) = state.identity.sign_out(&token).await {
            tracing::warn!(error = %e, "token revocation failed");
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(json!({ "message": "Signed out successfully" }))))
}

// GET /api/auth/session
pub async fn current_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let profile =
        queries::get_profile(&conn, &user.id)?.ok_or_else(|| AppError::not_found("Profile"))?;

    Ok(Json(json!({ "user": profile })))
}

// POST /api/auth/password-reset
#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: Option<String>,
}

pub async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<Json<Value>, AppError> {
    let email = present(&body.email).ok_or_else(|| AppError::bad_request("Email is required"))?;

    let redirect_to = format!("{}/reset-password", state.config.site_url.trim_end_matches('/'));
    state
        .identity
        .send_password_reset(&email.to_lowercase(), &redirect_to)
        .await?;

    Ok(Json(json!({ "message": "Password reset email sent" })))
}
