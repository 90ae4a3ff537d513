//! User management endpoints.
//!
//! Reads require the power role, writes require admin.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, PowerUser, ServerSettings};
use crate::db::{CreateUserError, Database, UpdateUserError, UserRole, UserSummary, UserUpdate};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{MAX_PASSWORD_BYTES, hash_async};

const MAX_USERNAME_LEN: usize = 32;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub settings: Arc<ServerSettings>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(state)
}

/// Trim and check a username. Returns the trimmed form.
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot be longer than {} characters",
            MAX_USERNAME_LEN
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, '_', '.' and '-'",
        ));
    }

    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::bad_request(format!(
            "Password cannot be longer than {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    #[serde(default)]
    role: Option<UserRole>,
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
}

#[derive(Serialize)]
struct DeleteResponse {
    detail: &'static str,
}

async fn create_user(
    State(state): State<UsersState>,
    auth: Auth<AdminOnly>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let username = validate_username(&payload.username)?.to_string();
    validate_password(&payload.password)?;
    let role = payload.role.unwrap_or(UserRole::User);

    let password_hash = hash_async(payload.password, state.settings.bcrypt_cost)
        .await
        .internal_err("Failed to hash password")?;

    let id = match state.db.users().create(&username, &password_hash, role).await {
        Ok(id) => id,
        Err(CreateUserError::UsernameTaken) => {
            return Err(ApiError::bad_request("Username already exists"));
        }
        Err(CreateUserError::Database(e)) => {
            return Err(ApiError::db_error("Failed to create user", e));
        }
    };

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| {
            ApiError::internal_error("Failed to get user", "created user is missing")
        })?;

    info!(
        admin = %auth.user.username(),
        user_id = id,
        username = %user.username,
        role = role.as_str(),
        "User created"
    );

    Ok((StatusCode::CREATED, Json(UserSummary::from(user))))
}

async fn list_users(
    State(state): State<UsersState>,
    _auth: Auth<PowerUser>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list users")?;

    Ok(Json(users))
}

async fn get_user(
    State(state): State<UsersState>,
    _auth: Auth<PowerUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserSummary::from(user)))
}

async fn update_user(
    State(state): State<UsersState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let username = match payload.username.as_deref() {
        Some(name) => Some(validate_username(name)?.to_string()),
        None => None,
    };

    if let Some(password) = payload.password.as_deref() {
        validate_password(password)?;
    }

    if id == auth.user.id() && payload.role.is_some_and(|role| role != UserRole::Admin) {
        return Err(ApiError::forbidden("Cannot remove your own admin role"));
    }

    let password_hash = match payload.password {
        Some(password) => Some(
            hash_async(password, state.settings.bcrypt_cost)
                .await
                .internal_err("Failed to hash password")?,
        ),
        None => None,
    };

    let update = UserUpdate {
        username,
        password_hash,
        role: payload.role,
    };

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let password_changed = update.password_hash.is_some();

    let user = match state.db.users().update(id, update).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::not_found("User not found")),
        Err(UpdateUserError::UsernameTaken) => {
            return Err(ApiError::bad_request("Username already exists"));
        }
        Err(UpdateUserError::Database(e)) => {
            return Err(ApiError::db_error("Failed to update user", e));
        }
    };

    info!(
        admin = %auth.user.username(),
        user_id = id,
        username = %user.username,
        role = user.role.as_str(),
        password_changed,
        "User updated"
    );

    Ok(Json(UserSummary::from(user)))
}

async fn delete_user(
    State(state): State<UsersState>,
    auth: Auth<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.id == auth.user.id() {
        return Err(ApiError::forbidden("Cannot delete yourself"));
    }

    let deleted = state
        .db
        .users()
        .delete(user.id)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    info!(
        admin = %auth.user.username(),
        user_id = id,
        username = %user.username,
        "User deleted"
    );

    Ok(Json(DeleteResponse {
        detail: "User deleted successfully",
    }))
}
