//! Tests for startup: secret validation, default admin seeding, and health.

mod common;

use std::process::{Command, Stdio};

use axum::http::StatusCode;
use common::{TEST_COST, body_json, create_test_app, empty_request};
use roster::cli::{SeedError, SeedOutcome, seed_default_admin};
use roster::db::{Database, UserRole};

fn run_binary(envs: &[(&str, &str)], args: &[&str]) -> (bool, String) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_roster"));
    command
        .env_remove("JWT_SECRET")
        .env_remove("ADMIN_PASSWORD")
        .args(["--database", ":memory:"])
        .args(args)
        .stderr(Stdio::piped())
        .stdout(Stdio::piped());
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command.output().expect("Failed to run binary");

    // tracing logs to stdout by default
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    (output.status.success(), format!("{}{}", stdout, stderr))
}

#[test]
fn test_missing_jwt_secret_exits_with_error() {
    let (success, output) = run_binary(&[], &[]);

    assert!(!success, "Should exit with error when JWT_SECRET is missing");
    assert!(
        output.contains("JWT_SECRET") && output.contains("required"),
        "Should mention JWT_SECRET is required, got: {}",
        output
    );
}

#[test]
fn test_short_jwt_secret_exits_with_error() {
    let (success, output) = run_binary(&[("JWT_SECRET", "too-short")], &[]);

    assert!(!success, "Should exit with error for a short secret");
    assert!(
        output.contains("shorter than"),
        "Should explain the secret is too short, got: {}",
        output
    );
}

#[test]
fn test_missing_secret_file_exits_with_error() {
    let (success, output) = run_binary(&[], &["--jwt-secret-file", "/nonexistent/secret"]);

    assert!(!success);
    assert!(
        output.contains("Failed to read JWT secret file"),
        "got: {}",
        output
    );
}

#[test]
fn test_overlong_token_lifetime_rejected() {
    let (success, output) = run_binary(
        &[("JWT_SECRET", "test-secret-that-is-long-enough!!")],
        &["--token-minutes", "99999999999999999"],
    );
    assert!(!success);
    assert!(output.contains("token-minutes"), "got: {}", output);
}

#[test]
fn test_invalid_bcrypt_cost_rejected() {
    let (success, _) = run_binary(
        &[("JWT_SECRET", "test-secret-that-is-long-enough!!")],
        &["--bcrypt-cost", "2"],
    );
    assert!(!success);
}

// =============================================================================
// Default admin seeding
// =============================================================================

#[tokio::test]
async fn test_seed_creates_admin_on_empty_database() {
    let db = Database::open(":memory:").await.unwrap();

    let outcome = seed_default_admin(&db, "admin", Some("changeme"), TEST_COST)
        .await
        .unwrap();
    let SeedOutcome::Created(id) = outcome else {
        panic!("expected admin to be created, got {:?}", outcome);
    };

    let user = db.users().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(user.username, "admin");
    assert_eq!(user.role, UserRole::Admin);
    assert!(roster::password::verify_password("changeme", &user.password_hash).unwrap());
}

#[tokio::test]
async fn test_seed_skipped_when_admin_exists() {
    let db = Database::open(":memory:").await.unwrap();
    db.users()
        .create("boss", "$2b$04$placeholder", UserRole::Admin)
        .await
        .unwrap();

    let outcome = seed_default_admin(&db, "admin", Some("changeme"), TEST_COST)
        .await
        .unwrap();
    assert_eq!(outcome, SeedOutcome::Skipped);
    assert!(db.users().get_by_username("admin").await.unwrap().is_none());
}

#[tokio::test]
async fn test_seed_reports_missing_admin() {
    let db = Database::open(":memory:").await.unwrap();
    db.users()
        .create("someone", "$2b$04$placeholder", UserRole::Power)
        .await
        .unwrap();

    let outcome = seed_default_admin(&db, "admin", Some("changeme"), TEST_COST)
        .await
        .unwrap();
    assert_eq!(outcome, SeedOutcome::NoAdmin);
    assert_eq!(db.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let db = Database::open(":memory:").await.unwrap();

    let first = seed_default_admin(&db, "admin", Some("changeme"), TEST_COST)
        .await
        .unwrap();
    assert!(matches!(first, SeedOutcome::Created(_)));

    let second = seed_default_admin(&db, "admin", Some("other"), TEST_COST)
        .await
        .unwrap();
    assert_eq!(second, SeedOutcome::Skipped);
    assert_eq!(db.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_seed_without_password() {
    let db = Database::open(":memory:").await.unwrap();

    let outcome = seed_default_admin(&db, "admin", None, TEST_COST)
        .await
        .unwrap();
    assert_eq!(outcome, SeedOutcome::MissingPassword);
    assert_eq!(db.users().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_seed_rejects_invalid_username() {
    let db = Database::open(":memory:").await.unwrap();

    let result = seed_default_admin(&db, "bad name", Some("changeme"), TEST_COST).await;
    assert!(matches!(result, Err(SeedError::InvalidUsername)));
}

#[tokio::test]
async fn test_seed_rejects_empty_password() {
    let db = Database::open(":memory:").await.unwrap();

    let result = seed_default_admin(&db, "admin", Some(""), TEST_COST).await;
    assert!(matches!(result, Err(SeedError::Password(_))));
    assert_eq!(db.users().count().await.unwrap(), 0);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_ok() {
    let t = create_test_app().await;

    let response = t.send(empty_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["app"], "Roster Test");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_health_reports_database_down() {
    let t = create_test_app().await;
    t.db.pool().close().await;

    let response = t.send(empty_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["database"], "unavailable");
}
