#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] runs the real routes, middleware and repositories over a
//! [`MemoryStore`] and a scripted identity provider, so tests need neither
//! PostgreSQL nor a network. The store handle is kept so tests can inject
//! faults and count rows directly.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use formcraft_kernel::identity::{
    AuthSession, IdentityError, IdentityProvider, IdentityUser, ProfileUpdate,
};
use formcraft_kernel::routes;
use formcraft_kernel::state::AppState;
use formcraft_kernel::store::MemoryStore;
use formcraft_test_utils::{TestAccount, test_account};

/// Password given to accounts created with [`TestApp::account`].
pub const TEST_PASSWORD: &str = "correct horse battery";

struct MockAccount {
    user: IdentityUser,
    password: String,
    token: String,
}

/// Identity provider that keeps accounts in memory.
#[derive(Default)]
pub struct MockIdentity {
    accounts: Mutex<Vec<MockAccount>>,
    revoked: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MockIdentity {
    /// Register an account directly.
    pub fn add(&self, account: &TestAccount, password: &str) {
        self.accounts.lock().push(MockAccount {
            user: IdentityUser {
                id: account.id,
                email: account.email.clone(),
                email_verified: true,
                name: None,
                avatar: None,
            },
            password: password.to_string(),
            token: account.token.clone(),
        });
    }

    /// Make every subsequent call fail as if the provider were down.
    pub fn go_down(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    fn with_token<T>(
        &self,
        token: &str,
        f: impl FnOnce(&mut MockAccount) -> T,
    ) -> Result<T, IdentityError> {
        self.check_up()?;
        if self.revoked.lock().contains(token) {
            return Err(IdentityError::InvalidToken);
        }
        let mut accounts = self.accounts.lock();
        accounts
            .iter_mut()
            .find(|a| a.token == token)
            .map(f)
            .ok_or(IdentityError::InvalidToken)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn verify_token(&self, token: &str) -> Result<IdentityUser, IdentityError> {
        self.with_token(token, |a| a.user.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.check_up()?;
        if self.accounts.lock().iter().any(|a| a.user.email == email) {
            return Err(IdentityError::Rejected("User already registered".into()));
        }
        let account = test_account(email);
        self.add(&account, password);
        let user = self.with_token(&account.token, |a| a.user.clone())?;
        Ok(AuthSession {
            user,
            access_token: Some(account.token),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.check_up()?;
        let accounts = self.accounts.lock();
        let account = accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .ok_or_else(|| IdentityError::Rejected("Invalid login credentials".into()))?;
        Ok(AuthSession {
            user: account.user.clone(),
            access_token: Some(account.token.clone()),
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        self.check_up()?;
        self.revoked.lock().insert(token.to_string());
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), IdentityError> {
        self.check_up()
    }

    async fn update_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        self.with_token(token, |a| {
            a.password = password.to_string();
            a.user.clone()
        })
    }

    async fn update_user_metadata(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<IdentityUser, IdentityError> {
        self.with_token(token, |a| {
            if let Some(name) = &update.name {
                a.user.name = Some(name.clone());
            }
            if let Some(avatar) = &update.avatar {
                a.user.avatar = Some(avatar.clone());
            }
            a.user.clone()
        })
    }
}

/// Status and decoded JSON body of a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The envelope's `data` member.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MockIdentity>,
    pub state: AppState,
}

impl TestApp {
    /// Build a fresh app with empty storage and no accounts.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(MockIdentity::default());
        let state = AppState::from_parts(store.clone(), identity.clone());
        Self {
            router: routes::app(state.clone()),
            store,
            identity,
            state,
        }
    }

    /// Create an account the identity provider will accept.
    pub fn account(&self, email: &str) -> TestAccount {
        let account = test_account(email);
        self.identity.add(&account, TEST_PASSWORD);
        account
    }

    /// Send a request with an optional bearer token and JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let body = body.map(|b| b.to_string());
        self.request_raw(method, path, token, body.as_deref()).await
    }

    /// Send a request with a raw (possibly malformed) body.
    pub async fn request_raw(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Create a form as `owner` and return its `data`.
    pub async fn create_form(&self, owner: &TestAccount, payload: Value) -> Value {
        let response = self.post("/api/forms", Some(&owner.token), payload).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "form creation failed: {}",
            response.body
        );
        response.data().clone()
    }

    /// Submit answers and return the new response ID.
    pub async fn submit(&self, form_id: &str, token: Option<&str>, answers: Value) -> Uuid {
        let response = self
            .post(&format!("/api/forms/{form_id}/responses"), token, answers)
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "submission failed: {}",
            response.body
        );
        response.data()["responseId"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap()
    }
}

/// The `id` member of a JSON object, as a string.
pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// IDs of a form's fields, in returned order.
pub fn field_ids(form: &Value) -> Vec<String> {
    form["fields"].as_array().unwrap().iter().map(id_of).collect()
}
