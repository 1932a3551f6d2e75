//! HTTP route handlers.
//!
//! Every route lives under `/api` and answers with the JSON [`Envelope`].

pub mod auth;
pub mod forms;
pub mod health;
pub mod responses;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;

use crate::identity::IdentityUser;
use crate::middleware::authenticate_bearer_token;
use crate::state::AppState;

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<IdentityUser>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful envelope carrying `data`.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            user: None,
            token: None,
            message: None,
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    /// A successful envelope with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            user: None,
            token: None,
            message: Some(message.into()),
        }
    }

    /// A successful envelope carrying a user and, optionally, a token.
    pub fn user(user: IdentityUser, token: Option<String>) -> Self {
        Self {
            success: true,
            data: None,
            user: Some(user),
            token,
            message: None,
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "error": "Resource not found" })),
    )
}

/// Create the `/api` router (without state or outer layers).
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .merge(forms::router())
        .merge(responses::router());

    Router::new().nest("/api", api).fallback(not_found)
}

/// The API with bearer authentication applied and state attached.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authenticate_bearer_token,
        ))
        .with_state(state)
}
