/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "store": "postgres",
///   "store_status": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,

    /// Application version
    pub version: String,

    /// Record store backend name
    pub store: String,

    /// "connected" or "disconnected"
    pub store_status: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match state.store.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.backend().to_string(),
        store_status: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
