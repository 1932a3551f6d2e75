//! Account and session routes, delegated to the identity provider.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::Envelope;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, MaybeCaller, RequireCaller};
use crate::identity::ProfileUpdate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl CredentialsRequest {
    /// Both fields, when present and non-empty.
    fn into_parts(self) -> AppResult<(String, String)> {
        match (self.email, self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Ok((email, password))
            }
            _ => Err(AppError::validation("Email and password are required")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewPasswordRequest {
    #[serde(default)]
    password: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<Envelope<()>>)> {
    let (email, password) = body.into_parts()?;
    let session = state
        .identity()
        .sign_up(&email, &password)
        .await
        .map_err(|e| e.into_app_error(StatusCode::BAD_REQUEST))?;

    info!(user_id = %session.user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(
            Envelope::user(session.user, session.access_token)
                .with_message("Registration successful"),
        ),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> AppResult<Json<Envelope<()>>> {
    let (email, password) = body.into_parts()?;
    let session = state
        .identity()
        .sign_in(&email, &password)
        .await
        .map_err(|e| e.into_app_error(StatusCode::UNAUTHORIZED))?;

    Ok(Json(
        Envelope::user(session.user, session.access_token).with_message("Login successful"),
    ))
}

async fn logout(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
) -> AppResult<Json<Envelope<()>>> {
    if let Some(caller) = caller {
        state
            .identity()
            .sign_out(&caller.token)
            .await
            .map_err(|e| e.into_app_error(StatusCode::BAD_REQUEST))?;
        info!(user_id = %caller.id(), "user signed out");
    }
    Ok(Json(Envelope::message("Logout successful")))
}

async fn me(MaybeCaller(caller): MaybeCaller) -> AppResult<Json<Envelope<()>>> {
    let caller =
        caller.ok_or_else(|| AppError::unauthenticated("No user is currently signed in"))?;
    Ok(Json(Envelope::user(caller.user, None)))
}

async fn update_profile(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> AppResult<Json<Envelope<()>>> {
    let user = state
        .identity()
        .update_user_metadata(&caller.token, &update)
        .await
        .map_err(|e| e.into_app_error(StatusCode::BAD_REQUEST))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(
        Envelope::user(user, None).with_message("Profile updated successfully"),
    ))
}

async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetRequest>,
) -> AppResult<Json<Envelope<()>>> {
    let email = body
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("Email is required"))?;
    state
        .identity()
        .send_password_reset(&email)
        .await
        .map_err(|e| e.into_app_error(StatusCode::BAD_REQUEST))?;

    Ok(Json(Envelope::message("Password reset email sent")))
}

async fn reset_password(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    ApiJson(body): ApiJson<NewPasswordRequest>,
) -> AppResult<Json<Envelope<()>>> {
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("New password is required"))?;
    state
        .identity()
        .update_password(&caller.token, &password)
        .await
        .map_err(|e| e.into_app_error(StatusCode::BAD_REQUEST))?;

    info!(user_id = %caller.id(), "password updated");
    Ok(Json(Envelope::message("Password updated successfully")))
}

/// Create the auth router (mounted at `/auth`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/reset-password/request", post(request_password_reset))
        .route("/reset-password", post(reset_password))
}
