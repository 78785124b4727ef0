/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bank_api::{app::AppState, config::Config};
/// use bank_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = bank_api::app::build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use bank_shared::service::{account::AccountService, transaction::TransactionService};
use bank_shared::store::RecordStore;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Record store behind both services
    pub store: Arc<dyn RecordStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Account lifecycle service using the configured policy
    pub fn accounts(&self) -> AccountService {
        AccountService::with_policy(self.store.clone(), self.config.accounts.clone())
    }

    /// Transaction ledger service
    pub fn ledger(&self) -> TransactionService {
        TransactionService::new(self.store.clone())
    }
}

/// Builds the Axum router
///
/// ```text
/// /
/// ├── GET    /health
/// ├── /account
/// │   ├── POST   /                      # open account
/// │   ├── DELETE /                      # unregister account
/// │   ├── GET    /?user_id=N            # list a user's accounts
/// │   └── GET    /:id                   # account by id
/// └── /transaction
///     ├── POST   /use
///     ├── POST   /cancel
///     └── GET    /:transaction_id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let account_routes = Router::new()
        .route(
            "/",
            post(routes::accounts::create_account)
                .delete(routes::accounts::delete_account)
                .get(routes::accounts::list_accounts),
        )
        .route("/:id", get(routes::accounts::get_account));

    let transaction_routes = Router::new()
        .route("/use", post(routes::transactions::use_balance))
        .route("/cancel", post(routes::transactions::cancel_balance))
        .route("/:transaction_id", get(routes::transactions::query_transaction));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/account", account_routes)
        .nest("/transaction", transaction_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
