//! Request extractors.
//!
//! Caller extractors read the [`AuthContext`] left by the bearer-auth
//! middleware; [`ApiJson`] maps body rejections to validation errors so they
//! answer in the JSON envelope.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthContext, Caller};

fn auth_context(parts: &Parts) -> AuthContext {
    parts
        .extensions
        .get::<AuthContext>()
        .cloned()
        .unwrap_or(AuthContext::Anonymous)
}

/// The caller when authenticated; anonymous otherwise (invalid tokens included).
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl MaybeCaller {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(Caller::id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeCaller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match auth_context(parts) {
            AuthContext::Verified(caller) => MaybeCaller(Some(caller)),
            _ => MaybeCaller(None),
        })
    }
}

/// An authenticated caller; rejects the request otherwise.
#[derive(Debug, Clone)]
pub struct RequireCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for RequireCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match auth_context(parts) {
            AuthContext::Verified(caller) => Ok(RequireCaller(caller)),
            AuthContext::Anonymous => Err(AppError::unauthenticated("Authentication required")),
            AuthContext::Invalid => Err(AppError::unauthenticated("Invalid or expired token")),
            AuthContext::Failed => Err(AppError::Identity {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Authentication failed".to_string(),
            }),
        }
    }
}

/// JSON body whose rejections become 400 validation errors.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}

/// Parse a path id; malformed ids cannot name anything, so they are NotFound.
pub fn parse_id(raw: &str, not_found: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(not_found))
}
