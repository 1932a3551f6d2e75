//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::identity::{GoTrueClient, IdentityProvider};
use crate::repository::{FormRepository, ResponseRepository};
use crate::store::{PgStore, Store};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    forms: FormRepository,
    responses: ResponseRepository,
}

impl AppState {
    /// Connect to PostgreSQL, apply migrations and build the identity client.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;

        let identity = GoTrueClient::new(
            &config.identity_url,
            &config.identity_api_key,
            config.identity_timeout,
        );
        info!(identity_url = %config.identity_url, "identity client configured");

        Ok(Self::from_parts(Arc::new(PgStore::new(pool)), Arc::new(identity)))
    }

    /// Build state over an explicit store and identity provider.
    pub fn from_parts(store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                forms: FormRepository::new(store.clone()),
                responses: ResponseRepository::new(store.clone()),
                store,
                identity,
            }),
        }
    }

    /// Get the identity provider.
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the form repository.
    pub fn forms(&self) -> &FormRepository {
        &self.inner.forms
    }

    /// Get the response repository.
    pub fn responses(&self) -> &ResponseRepository {
        &self.inner.responses
    }

    /// Check if the store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.store.ping().await
    }
}
