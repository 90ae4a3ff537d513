//! Password hashing and verification (bcrypt).

/// Longest password bcrypt will hash without silently truncating.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Cost used when none is configured.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with the given bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong);
    }
    bcrypt::hash(password, cost).map_err(PasswordError::Bcrypt)
}

/// Check a password against a stored bcrypt hash.
/// A malformed hash is an error rather than a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(PasswordError::Bcrypt)
}

/// Hash on the blocking pool so request workers are not stalled by bcrypt.
pub async fn hash_async(password: String, cost: u32) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|_| PasswordError::TaskFailed)?
}

/// Verify on the blocking pool.
pub async fn verify_async(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|_| PasswordError::TaskFailed)?
}

/// Errors that can occur while hashing or verifying passwords.
#[derive(Debug)]
pub enum PasswordError {
    /// Error from the bcrypt library (bad cost, malformed hash)
    Bcrypt(bcrypt::BcryptError),
    /// Empty password
    Empty,
    /// Password exceeds the bcrypt input limit
    TooLong,
    /// The blocking task panicked or was cancelled
    TaskFailed,
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Bcrypt(e) => write!(f, "bcrypt error: {}", e),
            PasswordError::Empty => write!(f, "Password cannot be empty"),
            PasswordError::TooLong => {
                write!(f, "Password is longer than {} bytes", MAX_PASSWORD_BYTES)
            }
            PasswordError::TaskFailed => write!(f, "Password hashing task failed"),
        }
    }
}

impl std::error::Error for PasswordError {}
