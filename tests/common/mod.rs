#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use roster::{
    ServerConfig, create_app,
    db::{Database, UserRole},
    jwt::JwtConfig,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

/// Lowest bcrypt cost, keeps hashing fast in tests.
pub const TEST_COST: u32 = 4;

pub const TOKEN_SECS: u64 = 30 * 60;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        token_duration_secs: TOKEN_SECS,
        secure_cookies: false,
        bcrypt_cost: TEST_COST,
        login_per_minute: 1000,
        behind_proxy: false,
        title: "Roster Test".to_string(),
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Create a test app after letting the caller adjust the config.
pub async fn create_test_app_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mut config = test_config(db.clone());
    adjust(&mut config);
    let jwt = JwtConfig::new(&config.jwt_secret, config.token_duration_secs);
    TestApp {
        app: create_app(&config),
        db,
        jwt,
    }
}

impl TestApp {
    /// Insert a user directly and return its ID.
    pub async fn create_user(&self, username: &str, password: &str, role: UserRole) -> i64 {
        let hash = roster::password::hash_password(password, TEST_COST).unwrap();
        self.db.users().create(username, &hash, role).await.unwrap()
    }

    /// Mint a valid access token cookie without going through login.
    pub fn cookie_for(&self, username: &str, role: UserRole) -> String {
        let access = self.jwt.generate_access_token(username, role).unwrap();
        format!("access_token={}", access.token)
    }

    /// Create a user and return its ID along with a cookie for it.
    pub async fn user_with_cookie(&self, username: &str, role: UserRole) -> (i64, String) {
        let id = self.create_user(username, "password123", role).await;
        (id, self.cookie_for(username, role))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/auth/login",
            None,
            &serde_json::json!({ "username": username, "password": password }),
        ))
        .await
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Turn a login response's Set-Cookie into a Cookie request header value.
pub fn session_cookie(response: &Response<Body>) -> String {
    extract_set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with("access_token=") && !c.contains("Max-Age=0"))
        .and_then(|c| c.split(';').next().map(|s| s.to_string()))
        .expect("response should set an access token cookie")
}

/// Check if cookies contain the access token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String]) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with("access_token=;") && c.contains("Max-Age=0"))
}
