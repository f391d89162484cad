use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::{AuthSession, AuthUser, IdentityError, IdentityProvider};

/// GoTrue client for a Supabase project.
pub struct SupabaseAuth {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn new(project_url: String, anon_key: String) -> Self {
        Self {
            base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let data = read_body(resp).await?;

        // With email confirmation on, GoTrue returns the bare user instead of a session
        let user = if data["user"].is_object() {
            &data["user"]
        } else {
            &data
        };
        parse_user(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let data = read_body(resp).await?;

        let access_token = data["access_token"]
            .as_str()
            .ok_or_else(|| IdentityError::Unexpected("missing access_token".to_string()))?;

        Ok(AuthSession {
            access_token: access_token.to_string(),
            refresh_token: data["refresh_token"].as_str().unwrap_or_default().to_string(),
            expires_in: data["expires_in"].as_i64().unwrap_or(3600),
            user: parse_user(&data["user"])?,
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, IdentityError> {
        let resp = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let data = read_body(resp).await?;
        parse_user(&data).map(Some)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-revoked token is as good as signed out
        if resp.status().is_success() || resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        read_body(resp).await.map(|_| ())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        read_body(resp).await.map(|_| ())
    }
}

async fn read_body(resp: reqwest::Response) -> Result<Value, IdentityError> {
    let status = resp.status();
    let text = resp.text().await?;
    let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

    if status.is_client_error() {
        return Err(IdentityError::Rejected(error_message(&data)));
    }
    if !status.is_success() {
        tracing::error!(status = %status, body = %text, "identity provider error");
        return Err(IdentityError::Unexpected(format!("status {status}")));
    }
    if data.is_null() {
        return Err(IdentityError::Unexpected("empty body".to_string()));
    }
    Ok(data)
}

fn error_message(data: &Value) -> String {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| data[*key].as_str())
        .unwrap_or("Authentication failed")
        .to_string()
}

fn parse_user(data: &Value) -> Result<AuthUser, IdentityError> {
    let id = data["id"]
        .as_str()
        .ok_or_else(|| IdentityError::Unexpected("missing user id".to_string()))?;
    Ok(AuthUser {
        id: id.to_string(),
        email: data["email"].as_str().unwrap_or_default().to_string(),
    })
}
