#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use casting_agency::{
    AppConfig, AppState, MemoryRepository, TokenVerifier, auth::Role, config::Env, create_router,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, jwk::JwkSet};
use serde_json::{Value, json};
use std::{sync::Arc, time::SystemTime};
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Signs arbitrary claims with the test secret (HS256).
pub fn sign(claims: &Value) -> String {
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

// RS256 key pair standing in for the identity provider's signing key.
const RS256_PRIVATE_KEY: &str = include_str!("../fixtures/rs256_test_key.pem");
const RS256_MODULUS: &str = concat!(
    "otc1pYEQlW8GF9WthobqkKeayr7YXiNETQ8RSrbUXalpoEP33L_AtfnkQlW5MJR0V75Gd7K1VOyG",
    "yY1FXcyIPyqFzXsOSbvoSjmUbCLigAdm3-KndQ5hkAZIU1zA6r3URoOZvjDYL0RDueT1ZlelL-gA",
    "9yunBfkc3XBlpKnJeFZATvWwxxdsyvUmuC1b7_ycBOrEUj3JgAOGxi9w6vbvIKi-DzjmbScdQFXC",
    "hkgYR-ISwNi-boO2dlVUccMAqC16PGQZC67rKH2hXChZGMh3-jlIBwVaBPUECak-jleAZgvVWXdp",
    "wQ3Dipb9tecc8tLkhR1wiY2kQRpRXUeSQ80F1w",
);
pub const PROVIDER_KID: &str = "casting-test-key";

/// The published key set of the test identity provider: one RS256 key under `PROVIDER_KID`.
pub fn provider_jwks() -> JwkSet {
    serde_json::from_value(json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": PROVIDER_KID,
            "n": RS256_MODULUS,
            "e": "AQAB",
        }]
    }))
    .unwrap()
}

/// Signs `claims` with the provider's private key, stamping `kid` into the header.
pub fn sign_rs256(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(RS256_PRIVATE_KEY.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// A one-hour token carrying exactly `permissions`.
pub fn token_with(permissions: &[&str]) -> String {
    sign(&json!({
        "sub": "auth0|tester",
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    }))
}

/// A one-hour token carrying the preset permissions of `role`.
pub fn role_token(role: Role) -> String {
    let permissions: Vec<String> = role
        .permissions()
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    sign(&json!({
        "sub": format!("auth0|{}", role.as_str()),
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    }))
}

pub fn test_state(repo: Arc<MemoryRepository>, env: Env) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo,
        config,
        verifier: Arc::new(TokenVerifier::shared_secret(TEST_JWT_SECRET, None, None)),
    }
}

/// Full router over a fresh in-memory repository. The repository handle is returned so
/// tests can seed data and inspect side effects.
pub fn test_app() -> (Router, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    (create_router(test_state(repo.clone(), Env::Production)), repo)
}

/// Sends one request through the router and returns the status and the JSON body
/// (`Value::Null` when the body is not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn assert_error(status: StatusCode, body: &Value, expected: StatusCode, message: &str) {
    assert_eq!(status, expected, "unexpected status, body: {body}");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], expected.as_u16());
    assert_eq!(body["message"], message);
}
