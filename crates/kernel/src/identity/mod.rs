//! Identity gateway.
//!
//! Accounts, sessions and token verification live in an external identity
//! provider. The kernel talks to it through [`IdentityProvider`], injected
//! into the application state as `Arc<dyn IdentityProvider>`. Calls bound to
//! a session take the caller's token explicitly.

mod gotrue;

pub use gotrue::GoTrueClient;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// A user account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Result of signing up or signing in.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: IdentityUser,
    /// Absent when the provider requires email confirmation first.
    pub access_token: Option<String>,
}

/// Profile metadata a user may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Identity provider failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    /// The presented token is not (or no longer) valid.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The provider refused the request (bad credentials, duplicate email...).
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or failed internally.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Map to an application error, using `rejected` as the status for
    /// refusals.
    pub fn into_app_error(self, rejected: StatusCode) -> AppError {
        match self {
            IdentityError::InvalidToken => AppError::unauthenticated("Invalid or expired token"),
            IdentityError::Rejected(message) => AppError::Identity {
                status: rejected,
                message,
            },
            IdentityError::Unavailable(_) => AppError::Identity {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: self.to_string(),
            },
        }
    }
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to its user.
    async fn verify_token(&self, token: &str) -> Result<IdentityUser, IdentityError>;

    /// Register a new account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Revoke the session behind `token`.
    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;

    /// Ask the provider to email a password reset link.
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Set a new password for the user behind `token`.
    async fn update_password(&self, token: &str, password: &str)
    -> Result<IdentityUser, IdentityError>;

    /// Update profile metadata for the user behind `token`.
    async fn update_user_metadata(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<IdentityUser, IdentityError>;
}
