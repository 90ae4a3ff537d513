pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::{create_api_router, create_health_router};
use auth::ServerSettings;
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Path prefix for the login, logout and user management routes.
pub const AUTH_PREFIX: &str = "/auth";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub token_duration_secs: u64,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// bcrypt cost for new password hashes
    pub bcrypt_cost: u32,
    /// Login attempts allowed per minute per client IP
    pub login_per_minute: u32,
    /// Whether to take the client IP from X-Forwarded-For
    pub behind_proxy: bool,
    /// Application title reported by the health endpoint
    pub title: String,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.jwt_secret,
        config.token_duration_secs,
    ));

    let settings = Arc::new(ServerSettings {
        secure_cookies: config.secure_cookies,
        bcrypt_cost: config.bcrypt_cost,
        behind_proxy: config.behind_proxy,
    });

    let rate_limit_config = Arc::new(RateLimitConfig::new(
        config.login_per_minute,
        config.behind_proxy,
    ));

    let api_router = create_api_router(config.db.clone(), jwt, settings, rate_limit_config);
    let health_router = create_health_router(config.db.clone(), Arc::from(config.title.as_str()));

    Router::new()
        .nest(AUTH_PREFIX, api_router)
        .nest("/health", health_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
