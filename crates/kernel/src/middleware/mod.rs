//! HTTP middleware.

pub mod bearer_auth;

pub use bearer_auth::{AuthContext, Caller, authenticate_bearer_token};
