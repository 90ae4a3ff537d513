//! Authentication state traits and macro.

use crate::db::Database;
use crate::jwt::JwtConfig;

/// Server-wide settings shared by every router state.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Whether to set the Secure flag on cookies
    pub secure_cookies: bool,
    /// bcrypt cost for new password hashes
    pub bcrypt_cost: u32,
    /// Whether to trust X-Forwarded-For for the client IP
    pub behind_proxy: bool,
}

/// Trait for state types that provide database and JWT access for authentication.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn settings(&self) -> &ServerSettings;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `db: Database`
/// - `settings: Arc<ServerSettings>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<JwtConfig>,
///     pub settings: Arc<ServerSettings>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn settings(&self) -> &$crate::auth::ServerSettings {
                &self.settings
            }
        }
    };
}
