//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{CreateUserError, Database, UserRole};
use crate::jwt::DEFAULT_TOKEN_DURATION_SECS;
use crate::password::{self, PasswordError};
use crate::rate_limit::DEFAULT_LOGIN_PER_MINUTE;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted access token lifetime: one year.
pub const MAX_TOKEN_MINUTES: u64 = 365 * 24 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Roster", about = "User management with JWT cookie login")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ROSTER_PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "ROSTER_DATABASE", default_value = "roster.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in minutes
    #[arg(long, default_value_t = DEFAULT_TOKEN_DURATION_SECS / 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_MINUTES))]
    pub token_minutes: u64,

    /// Set the Secure flag on cookies (enable when served over HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Trust the X-Forwarded-For header for the client IP (only behind a reverse proxy)
    #[arg(long)]
    pub behind_proxy: bool,

    /// bcrypt cost factor for new password hashes
    #[arg(long, default_value_t = password::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    /// Username of the admin created when the database has no users
    #[arg(long, default_value = "admin")]
    pub admin_username: String,

    /// Path to file containing the default admin password. Prefer using ADMIN_PASSWORD env var
    #[arg(long)]
    pub admin_password_file: Option<String>,

    /// Login attempts allowed per minute per client IP
    #[arg(long, default_value_t = DEFAULT_LOGIN_PER_MINUTE,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub login_per_minute: u32,

    /// Application title reported by the health endpoint
    #[arg(long, default_value = "Roster")]
    pub title: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read a secret from an environment variable (which is then cleared) or a file.
fn read_secret(env_var: &str, file: Option<&str>) -> Result<Option<String>, std::io::Error> {
    if let Ok(secret) = std::env::var(env_var) {
        // SAFETY: called during startup before the runtime spawns any task that
        // reads the environment.
        unsafe { std::env::remove_var(env_var) };
        return Ok(Some(secret));
    }

    match file {
        Some(path) => Ok(Some(std::fs::read_to_string(path)?.trim().to_string())),
        None => Ok(None),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = match read_secret("JWT_SECRET", jwt_secret_file) {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            error!(
                "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
            );
            return None;
        }
        Err(e) => {
            error!(path = ?jwt_secret_file, error = %e, "Failed to read JWT secret file");
            return None;
        }
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the default admin password from ADMIN_PASSWORD or a file.
/// `Ok(None)` means no password was configured.
pub fn load_admin_password(
    admin_password_file: Option<&str>,
) -> Result<Option<String>, std::io::Error> {
    read_secret("ADMIN_PASSWORD", admin_password_file)
}

/// What happened when seeding the default admin.
#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Users and at least one admin already exist; nothing was done
    Skipped,
    /// Users exist but none of them is an admin; nothing was done
    NoAdmin,
    /// The table is empty but no admin password was configured
    MissingPassword,
    /// The default admin was created with this ID
    Created(i64),
}

#[derive(Debug)]
pub enum SeedError {
    Database(sqlx::Error),
    Password(PasswordError),
    InvalidUsername,
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Database(e) => write!(f, "Database error: {}", e),
            SeedError::Password(e) => write!(f, "{}", e),
            SeedError::InvalidUsername => write!(f, "Invalid admin username"),
        }
    }
}

impl std::error::Error for SeedError {}

/// Create the default admin if the users table is empty.
/// A populated table is left alone even when it has no admin.
pub async fn seed_default_admin(
    db: &Database,
    username: &str,
    password: Option<&str>,
    bcrypt_cost: u32,
) -> Result<SeedOutcome, SeedError> {
    let users = db.users();
    if users.count().await.map_err(SeedError::Database)? > 0 {
        let admins = users
            .count_by_role(UserRole::Admin)
            .await
            .map_err(SeedError::Database)?;
        return Ok(if admins > 0 {
            SeedOutcome::Skipped
        } else {
            SeedOutcome::NoAdmin
        });
    }

    let Some(password) = password else {
        return Ok(SeedOutcome::MissingPassword);
    };

    let username =
        crate::api::validate_username(username).map_err(|_| SeedError::InvalidUsername)?;
    let hash = password::hash_async(password.to_string(), bcrypt_cost)
        .await
        .map_err(SeedError::Password)?;

    match users.create(username, &hash, UserRole::Admin).await {
        Ok(id) => Ok(SeedOutcome::Created(id)),
        // Another process seeded between the count and the insert
        Err(CreateUserError::UsernameTaken) => Ok(SeedOutcome::Skipped),
        Err(CreateUserError::Database(e)) => Err(SeedError::Database(e)),
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        token_duration_secs: args.token_minutes.saturating_mul(60),
        secure_cookies: args.secure_cookies,
        bcrypt_cost: args.bcrypt_cost,
        login_per_minute: args.login_per_minute,
        behind_proxy: args.behind_proxy,
        title: args.title.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["roster"]);
        assert_eq!(args.port, 8000);
        assert_eq!(args.database, "roster.db");
        assert_eq!(args.token_minutes, 30);
        assert_eq!(args.bcrypt_cost, password::DEFAULT_COST);
        assert_eq!(args.admin_username, "admin");
        assert_eq!(args.login_per_minute, DEFAULT_LOGIN_PER_MINUTE);
        assert!(!args.secure_cookies);
        assert!(!args.behind_proxy);
    }

    #[test]
    fn test_rejects_bad_cost() {
        assert!(Args::try_parse_from(["roster", "--bcrypt-cost", "3"]).is_err());
        assert!(Args::try_parse_from(["roster", "--bcrypt-cost", "32"]).is_err());
        assert!(Args::try_parse_from(["roster", "--bcrypt-cost", "10"]).is_ok());
    }

    #[test]
    fn test_token_minutes_bounds() {
        assert!(Args::try_parse_from(["roster", "--token-minutes", "0"]).is_err());
        let too_long = (MAX_TOKEN_MINUTES + 1).to_string();
        assert!(Args::try_parse_from(["roster", "--token-minutes", too_long.as_str()]).is_err());
        let longest = MAX_TOKEN_MINUTES.to_string();
        assert!(Args::try_parse_from(["roster", "--token-minutes", longest.as_str()]).is_ok());
        assert!(Args::try_parse_from(["roster", "--token-minutes", "99999999999999999"]).is_err());
    }

    #[tokio::test]
    async fn test_build_config() {
        let args = Args::parse_from(["roster", "--token-minutes", "5", "--secure-cookies"]);
        let db = Database::open(":memory:").await.unwrap();
        let config = build_config(&args, db, "s".repeat(32));
        assert_eq!(config.token_duration_secs, 300);
        assert!(config.secure_cookies);
        assert_eq!(config.jwt_secret.len(), 32);
    }
}
