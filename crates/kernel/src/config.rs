//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 5000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Base URL of the GoTrue-compatible identity server.
    pub identity_url: String,

    /// Project API key sent to the identity server.
    pub identity_api_key: String,

    /// Timeout for each identity server call (default: 10s).
    pub identity_timeout: Duration,

    /// CORS allowed origins (comma-separated; falls back to CLIENT_URL,
    /// then http://localhost:3000).
    pub cors_allowed_origins: Vec<String>,

    /// Deployment mode (default: "development").
    pub app_env: String,

    /// Timeout for a whole HTTP request (default: 30s).
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "5000")
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let identity_url =
            lookup("IDENTITY_URL").context("IDENTITY_URL environment variable is required")?;

        let identity_api_key = lookup("IDENTITY_API_KEY")
            .context("IDENTITY_API_KEY environment variable is required")?;

        let identity_timeout = var("IDENTITY_TIMEOUT_SECS", "10")
            .parse()
            .map(Duration::from_secs)
            .context("IDENTITY_TIMEOUT_SECS must be a whole number of seconds")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .or_else(|| lookup("CLIENT_URL"))
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let app_env = var("APP_ENV", "development").to_lowercase();

        let request_timeout = var("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .map(Duration::from_secs)
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            identity_url,
            identity_api_key,
            identity_timeout,
            cors_allowed_origins,
            app_env,
            request_timeout,
        })
    }

    /// Whether server-side error details may be shown to clients.
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
