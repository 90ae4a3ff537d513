//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::UserRole;

// =============================================================================
// Role constraints
// =============================================================================

/// Compile-time role requirement for the `Auth` extractor.
pub trait RoleConstraint {
    fn allows(role: UserRole) -> bool;
}

/// Any logged-in user.
pub struct AnyRole;

/// Power users and admins.
pub struct PowerUser;

/// Admins only.
pub struct AdminOnly;

impl RoleConstraint for AnyRole {
    fn allows(_role: UserRole) -> bool {
        true
    }
}

impl RoleConstraint for PowerUser {
    fn allows(role: UserRole) -> bool {
        role >= UserRole::Power
    }
}

impl RoleConstraint for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }
}

/// Resolve the request's access token cookie to a user.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token =
        get_cookie(&parts.headers, ACCESS_COOKIE_NAME).ok_or(AuthErrorKind::NotAuthenticated)?;
    if token.is_empty() {
        return Err(AuthErrorKind::NotAuthenticated);
    }

    let claims = state
        .jwt()
        .validate_access_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    // The stored role is authoritative; the role claim may predate a change.
    let user = state
        .db()
        .users()
        .get_by_username(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::DatabaseError
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    if user.role != claims.role {
        tracing::debug!(
            username = %user.username,
            token_role = claims.role.as_str(),
            stored_role = user.role.as_str(),
            "Token role is stale, using stored role"
        );
    }

    Ok(AuthenticatedUser { user })
}

// =============================================================================
// API Extractors
// =============================================================================

/// Extractor for API endpoints that require authentication with a given role.
/// Returns JSON errors: 401 when not logged in, 403 when the role is too low.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub user: AuthenticatedUser,
    _role: PhantomData<R>,
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint + Send,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secure = state.settings().secure_cookies;
        let user = authenticate_request(parts, state)
            .await
            .map_err(|kind| ApiAuthError::new(kind, secure))?;

        if !R::allows(user.user.role) {
            tracing::warn!(
                username = %user.user.username,
                role = user.user.role.as_str(),
                path = %parts.uri.path(),
                "Insufficient role"
            );
            return Err(ApiAuthError::new(AuthErrorKind::InsufficientRole, secure));
        }

        Ok(Auth {
            user,
            _role: PhantomData,
        })
    }
}

/// Optional authentication extractor - never fails, returns Option<AuthenticatedUser>.
/// Useful for endpoints that work both authenticated and unauthenticated.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}
