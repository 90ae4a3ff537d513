mod error;
mod health;
mod session;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::ServerSettings;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;
pub use users::{validate_password, validate_username};

/// Create the authentication and user management router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    settings: Arc<ServerSettings>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let session_state = session::SessionState {
        db: db.clone(),
        jwt: jwt.clone(),
        settings: settings.clone(),
        rate_limit_config,
    };

    let users_state = users::UsersState { db, jwt, settings };

    Router::new()
        .nest("/users", users::router(users_state))
        .merge(session::router(session_state))
}

/// Create the health check router.
pub fn create_health_router(db: Database, title: Arc<str>) -> Router {
    health::router(health::HealthState { db, title })
}
