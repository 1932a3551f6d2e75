//! Bearer token authentication middleware.
//!
//! Reads the token from `Authorization: Bearer <token>` or the
//! `access_token` cookie, verifies it with the identity provider and records
//! the outcome as an [`AuthContext`] in the request extensions. It never
//! rejects a request itself; handlers decide through the caller extractors.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::identity::{IdentityError, IdentityUser};
use crate::state::AppState;

/// Cookie carrying the access token for browser clients.
pub const TOKEN_COOKIE: &str = "access_token";

/// A verified caller.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: IdentityUser,
    /// The token the caller presented, for session-bound identity calls.
    pub token: String,
}

impl Caller {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Authentication outcome for one request.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No token presented.
    Anonymous,
    /// A token was presented and refused.
    Invalid,
    /// The token could not be checked (identity provider unavailable).
    Failed,
    Verified(Caller),
}

/// Extract the token from the Authorization header, falling back to the
/// access token cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Middleware to authenticate bearer tokens.
pub async fn authenticate_bearer_token(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = match extract_token(request.headers()) {
        None => AuthContext::Anonymous,
        Some(token) => match state.identity().verify_token(&token).await {
            Ok(user) => AuthContext::Verified(Caller { user, token }),
            Err(IdentityError::Unavailable(e)) => {
                warn!(error = %e, "could not verify bearer token");
                AuthContext::Failed
            }
            Err(e) => {
                debug!(error = %e, "invalid bearer token");
                AuthContext::Invalid
            }
        },
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}
