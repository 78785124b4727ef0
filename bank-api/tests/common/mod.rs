/// Common test utilities for API integration tests
///
/// Builds the full router over an in-memory record store, so tests run
/// without PostgreSQL.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bank_api::app::{build_router, AppState};
use bank_api::config::Config;
use bank_shared::models::account_user::AccountUser;
use bank_shared::store::MemoryStore;
use serde_json::Value;
use tower::Service as _;

/// Test context containing the app and its backing store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub user: AccountUser,
}

impl TestContext {
    /// Creates a fresh store with one user, "Pobi", id 12
    pub async fn new() -> Self {
        let config = Config::from_source(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("memory config is valid");

        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user_with_id(12, "Pobi").await;
        let app = build_router(AppState::new(store.clone(), config));

        TestContext { store, app, user }
    }

    /// Sends a request and returns status plus parsed JSON body
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .call(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    /// Opens an account through the API and returns its number
    pub async fn open_account(&self, user_id: i64, initial_balance: i64) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/account",
                Some(serde_json::json!({
                    "user_id": user_id,
                    "initial_balance": initial_balance,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "open account failed: {}", body);
        body["account_number"].as_str().unwrap().to_string()
    }
}
