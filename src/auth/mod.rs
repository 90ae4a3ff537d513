//! JWT cookie authentication with role-based access control.
//!
//! Login issues a signed, stateless access token in an HttpOnly cookie. Each
//! protected request decodes the cookie, resolves the user it names, and checks
//! the role required by the route.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{ACCESS_COOKIE_NAME, access_cookie, clear_access_cookie, get_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminOnly, AnyRole, Auth, OptionalAuth, PowerUser, RoleConstraint};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use state::{HasAuthBackend, ServerSettings};
pub use types::AuthenticatedUser;
