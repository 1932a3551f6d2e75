//! GoTrue-compatible HTTP identity client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser, ProfileUpdate};

/// Client for a GoTrue auth server (`{base_url}/auth/v1/...`).
#[derive(Clone)]
pub struct GoTrueClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}/auth/v1{path}", self.base_url))
            .header("apikey", &self.api_key);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request and return the JSON body of a successful response.
    ///
    /// With `token_bound`, 401/403 answers mean the token is invalid.
    async fn send(
        &self,
        request: RequestBuilder,
        token_bound: bool,
    ) -> Result<Value, IdentityError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "identity provider request failed");
            IdentityError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let json = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::String(body))
        };

        if status.is_success() {
            return Ok(json);
        }
        debug!(status = %status, "identity provider refused request");
        Err(classify(status, &json, token_bound))
    }
}

/// Classify a non-success answer.
fn classify(status: StatusCode, body: &Value, token_bound: bool) -> IdentityError {
    if token_bound && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return IdentityError::InvalidToken;
    }
    let message = error_message(body).unwrap_or_else(|| status.to_string());
    if status.is_client_error() {
        IdentityError::Rejected(message)
    } else {
        IdentityError::Unavailable(message)
    }
}

/// Extract the human-readable message from an error body.
fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// Parse a GoTrue user object.
fn parse_user(value: &Value) -> Result<IdentityUser, IdentityError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| IdentityError::Unavailable("malformed user payload".to_string()))?;
    let metadata = value.get("user_metadata");
    let meta = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(IdentityUser {
        id,
        email: value
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        email_verified: value
            .get("email_confirmed_at")
            .is_some_and(|v| !v.is_null()),
        name: meta("name"),
        avatar: meta("avatar"),
    })
}

/// Parse a session (`{access_token, user}`) or, for signups awaiting
/// confirmation, a bare user object.
fn parse_session(value: &Value) -> Result<AuthSession, IdentityError> {
    match value.get("access_token").and_then(Value::as_str) {
        Some(token) => {
            let user = value
                .get("user")
                .ok_or_else(|| IdentityError::Unavailable("session without user".to_string()))?;
            Ok(AuthSession {
                user: parse_user(user)?,
                access_token: Some(token.to_string()),
            })
        }
        None => Ok(AuthSession {
            user: parse_user(value)?,
            access_token: None,
        }),
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn verify_token(&self, token: &str) -> Result<IdentityUser, IdentityError> {
        let body = self
            .send(self.request(Method::GET, "/user", Some(token)), true)
            .await?;
        parse_user(&body)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let request = self
            .request(Method::POST, "/signup", None)
            .json(&json!({ "email": email, "password": password }));
        parse_session(&self.send(request, false).await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let request = self
            .request(Method::POST, "/token?grant_type=password", None)
            .json(&json!({ "email": email, "password": password }));
        parse_session(&self.send(request, false).await?)
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        self.send(self.request(Method::POST, "/logout", Some(token)), true)
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let request = self
            .request(Method::POST, "/recover", None)
            .json(&json!({ "email": email }));
        self.send(request, false).await?;
        Ok(())
    }

    async fn update_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let request = self
            .request(Method::PUT, "/user", Some(token))
            .json(&json!({ "password": password }));
        parse_user(&self.send(request, true).await?)
    }

    async fn update_user_metadata(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<IdentityUser, IdentityError> {
        let request = self
            .request(Method::PUT, "/user", Some(token))
            .json(&json!({ "data": update }));
        parse_user(&self.send(request, true).await?)
    }
}
