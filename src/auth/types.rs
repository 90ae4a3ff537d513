//! Authentication user types.

use crate::db::User;

/// Authenticated user resolved from the access token cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Current database row for the token subject
    pub user: User,
}

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }
}
