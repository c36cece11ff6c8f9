use std::net::TcpListener;

use product_api::auth::{RefreshToken, TokenCodec};
use product_api::configuration::JwtSettings;
use product_api::startup::run;
use product_api::store::Stores;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub stores: Stores,
    pub jwt: JwtSettings,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/auth/register", &json!({"email": email, "password": password}))
            .await
    }

    /// Registers a@x.com and returns its token pair
    async fn token_pair(&self) -> (String, String) {
        let body: Value = self
            .register("a@x.com", "Passw0rd")
            .await
            .json()
            .await
            .expect("Failed to parse response");
        (
            body["token"].as_str().expect("No token").to_string(),
            body["refreshToken"].as_str().expect("No refresh token").to_string(),
        )
    }

    async fn refresh(&self, token: &str, refresh_token: &str) -> reqwest::Response {
        self.post(
            "/auth/refresh-token",
            &json!({"token": token, "refreshToken": refresh_token}),
        )
        .await
    }
}

fn jwt_settings(access_token_expiry: i64) -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-at-least-32-chars".to_string(),
        access_token_expiry,
        refresh_token_expiry_months: 6,
        issuer: "product-api-test".to_string(),
    }
}

/// `access_token_expiry` of 0 makes every access token expired on arrival.
async fn spawn_app(access_token_expiry: i64) -> TestApp {
    spawn_app_with(jwt_settings(access_token_expiry)).await
}

async fn spawn_app_with(jwt: JwtSettings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let stores = Stores::in_memory();

    let server = run(listener, stores.clone(), jwt.clone()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        stores,
        jwt,
        client: reqwest::Client::new(),
    }
}

async fn errors_of(response: reqwest::Response) -> Vec<String> {
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
    body["errors"]
        .as_array()
        .expect("errors should be an array")
        .iter()
        .map(|e| e.as_str().unwrap().to_string())
        .collect()
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_200_with_token_pair() {
    let app = spawn_app(30).await;

    let response = app.register("a@x.com", "Passw0rd").await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].as_str().is_some());
    assert!(body["refreshToken"].as_str().is_some());

    let user = app
        .stores
        .credentials
        .find_by_email("a@x.com")
        .await
        .unwrap()
        .expect("User should be stored");
    let claims = TokenCodec::new(&app.jwt)
        .unwrap()
        .validate(body["token"].as_str().unwrap())
        .unwrap()
        .claims;
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn register_returns_400_for_duplicate_email() {
    let app = spawn_app(30).await;

    assert_eq!(200, app.register("a@x.com", "Passw0rd").await.status().as_u16());

    let response = app.register("a@x.com", "Passw0rd").await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["Email already in use"]);
}

#[tokio::test]
async fn register_returns_400_for_weak_password() {
    let app = spawn_app(30).await;

    let response = app.register("a@x.com", "ABC").await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await.len(), 2);
}

#[tokio::test]
async fn register_returns_400_for_invalid_payload() {
    let app = spawn_app(30).await;

    let test_cases = vec![
        (json!({"password": "Passw0rd"}), "missing email"),
        (json!({"email": "a@x.com"}), "missing password"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = app.post("/auth/register", &body).await;

        assert_eq!(400, response.status().as_u16(), "Should reject request: {}", reason);
        assert_eq!(errors_of(response).await, vec!["Invalid payload"]);
    }
}

#[tokio::test]
async fn register_returns_400_for_invalid_email() {
    let app = spawn_app(30).await;

    for invalid_email in ["notanemail", "user@", "@example.com", "user@@example.com"] {
        let response = app.register(invalid_email, "Passw0rd").await;
        assert_eq!(400, response.status().as_u16(), "Should reject invalid email: {}", invalid_email);
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app(30).await;
    app.register("a@x.com", "Passw0rd").await;

    let response = app
        .post("/auth/login", &json!({"email": "a@x.com", "password": "Passw0rd"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.get("token").is_some());
    assert!(body.get("refreshToken").is_some());
}

#[tokio::test]
async fn login_returns_400_for_wrong_password() {
    let app = spawn_app(30).await;
    app.register("a@x.com", "Passw0rd").await;

    let response = app
        .post("/auth/login", &json!({"email": "a@x.com", "password": "wrong"}))
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["Invalid login request"]);
}

#[tokio::test]
async fn login_returns_400_for_unknown_user() {
    let app = spawn_app(30).await;

    let response = app
        .post("/auth/login", &json!({"email": "nobody@x.com", "password": "Passw0rd"}))
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["Invalid login request"]);
}

// --- Token Refresh Tests ---

#[tokio::test]
async fn refresh_returns_200_for_expired_access_token() {
    let app = spawn_app(0).await;
    let (token, refresh_token) = app.token_pair().await;

    let response = app.refresh(&token, &refresh_token).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let new_refresh_token = body["refreshToken"].as_str().expect("No new refresh token");
    assert_ne!(refresh_token, new_refresh_token, "Refresh token should be rotated");
    assert_ne!(token, body["token"].as_str().expect("No new token"));
}

#[tokio::test]
async fn refresh_token_can_only_be_used_once() {
    let app = spawn_app(0).await;
    let (token, refresh_token) = app.token_pair().await;

    assert_eq!(200, app.refresh(&token, &refresh_token).await.status().as_u16());

    let replay = app.refresh(&token, &refresh_token).await;
    assert_eq!(400, replay.status().as_u16());
    assert_eq!(errors_of(replay).await, vec!["token has been used"]);
}

#[tokio::test]
async fn refresh_returns_400_for_live_access_token() {
    let app = spawn_app(3600).await;
    let (token, refresh_token) = app.token_pair().await;

    let response = app.refresh(&token, &refresh_token).await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["token not yet expired"]);
}

#[tokio::test]
async fn refresh_returns_400_for_mismatched_pair() {
    let app = spawn_app(0).await;
    let (token, _) = app.token_pair().await;

    let other: Value = app
        .post("/auth/login", &json!({"email": "a@x.com", "password": "Passw0rd"}))
        .await
        .json()
        .await
        .expect("Failed to parse response");

    let response = app
        .refresh(&token, other["refreshToken"].as_str().unwrap())
        .await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["token does not match"]);
}

#[tokio::test]
async fn refresh_returns_400_for_revoked_token() {
    let app = spawn_app(0).await;
    let (token, refresh_token) = app.token_pair().await;

    let jti = TokenCodec::new(&app.jwt).unwrap().validate(&token).unwrap().claims.jti;
    assert!(app.stores.refresh_tokens.revoke(&jti).await.unwrap());

    let response = app.refresh(&token, &refresh_token).await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["token has been revoked"]);
}

#[tokio::test]
async fn refresh_returns_400_for_unknown_refresh_token() {
    let app = spawn_app(0).await;
    let (token, _) = app.token_pair().await;

    let response = app.refresh(&token, "definitely_not_a_stored_token").await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["token does not exist"]);
}

#[tokio::test]
async fn refresh_returns_400_for_garbage_access_token() {
    let app = spawn_app(0).await;
    let (_, refresh_token) = app.token_pair().await;

    let response = app.refresh("invalid.token.here", &refresh_token).await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["invalid token"]);
}

#[tokio::test]
async fn refresh_returns_400_for_missing_fields() {
    let app = spawn_app(0).await;

    let test_cases = vec![
        (json!({"token": "abc"}), "missing refresh token"),
        (json!({"refreshToken": "abc"}), "missing token"),
        (json!({}), "missing both"),
    ];

    for (body, reason) in test_cases {
        let response = app.post("/auth/refresh-token", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject request: {}", reason);
        assert_eq!(errors_of(response).await, vec!["Invalid payload"]);
    }
}

#[tokio::test]
async fn concurrent_refresh_with_same_pair_has_one_winner() {
    let app = spawn_app(0).await;
    let (token, refresh_token) = app.token_pair().await;

    let (first, second) = tokio::join!(
        app.refresh(&token, &refresh_token),
        app.refresh(&token, &refresh_token)
    );

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 400]);

    let loser = if first.status().as_u16() == 400 { first } else { second };
    assert_eq!(errors_of(loser).await, vec!["token has been used"]);
}

#[tokio::test]
async fn refresh_reports_invalid_tokens_when_reissue_fails() {
    // Replacement refresh rows cannot be dated this far out
    let mut jwt = jwt_settings(0);
    jwt.refresh_token_expiry_months = u32::MAX;
    let app = spawn_app_with(jwt).await;

    let user = app.stores.credentials.create("a@x.com", "Passw0rd").await.unwrap();
    let access = TokenCodec::new(&app.jwt).unwrap().issue(&user).unwrap();
    let row = RefreshToken::issue(&access.jti, user.id, 6).unwrap();
    app.stores.refresh_tokens.insert(&row).await.unwrap();

    let response = app.refresh(&access.token, &row.token).await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(errors_of(response).await, vec!["Invalid tokens"]);
}
