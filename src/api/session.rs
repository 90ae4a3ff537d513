//! Login, logout, and current-user endpoints.
//!
//! - POST `/login` - Verify credentials and set the access token cookie
//! - POST `/logout` - Clear the access token cookie
//! - GET `/me` - Current user

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    AnyRole, Auth, OptionalAuth, ServerSettings, access_cookie, clear_access_cookie,
};
use crate::db::{Database, UserSummary};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{MAX_PASSWORD_BYTES, verify_async};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub settings: Arc<ServerSettings>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(SessionState);

pub fn router(state: SessionState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    msg: String,
}

async fn login(
    State(state): State<SessionState>,
    OptionalAuth(current): OptionalAuth,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(current) = current {
        return Err(ApiError::bad_request(format!(
            "Already logged in as {}",
            current.username()
        )));
    }

    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Login failed: malformed request body");
        ApiError::unauthorized("Invalid credentials")
    })?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.len() > MAX_PASSWORD_BYTES {
        warn!(username = %username, "Login failed: malformed credentials");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let user = state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to get user")?;

    let Some(user) = user else {
        warn!(username = %username, "Login failed: unknown user");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let valid = verify_async(payload.password, user.password_hash.clone())
        .await
        .internal_err("Failed to verify password")?;

    if !valid {
        warn!(username = %user.username, "Login failed: wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let access = state
        .jwt
        .generate_access_token(&user.username, user.role)
        .internal_err("Failed to generate token")?;

    let cookie = access_cookie(&access.token, access.duration, state.settings.secure_cookies);

    info!(username = %user.username, role = user.role.as_str(), "Logged in");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            msg: format!("Logged in as {}", user.username),
        }),
    ))
}

async fn logout(State(state): State<SessionState>, auth: Auth<AnyRole>) -> impl IntoResponse {
    info!(username = %auth.user.username(), "Logged out");

    (
        StatusCode::OK,
        [(SET_COOKIE, clear_access_cookie(state.settings.secure_cookies))],
        Json(MessageResponse {
            msg: format!("User {} logged out", auth.user.username()),
        }),
    )
}

async fn me(auth: Auth<AnyRole>) -> Json<UserSummary> {
    Json(UserSummary::from(auth.user.user))
}
