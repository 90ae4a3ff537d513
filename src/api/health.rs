//! Public health endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::db::Database;

/// Version embedded at compile time from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct HealthState {
    pub db: Database,
    pub title: Arc<str>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    app: Arc<str>,
    version: &'static str,
    database: &'static str,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = match state.db.ping().await {
        Ok(()) => ("ok", "ok", StatusCode::OK),
        Err(e) => {
            tracing::error!("Health check database ping failed: {}", e);
            ("error", "unavailable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            app: state.title.clone(),
            version: VERSION,
            database,
        }),
    )
}
