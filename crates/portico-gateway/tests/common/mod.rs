//! Shared fixtures for the gateway integration tests.

#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::{Json, Router, routing::get};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use portico_gateway::config::GatewayServerConfig;
use portico_gateway::keys::KeySet;
use portico_gateway::server::build_router;
use portico_gateway::state::AppState;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const KID: &str = "it-key";
pub const SECRET: &[u8] = b"integration-secret-long-enough-for-hs256";

pub fn key_set() -> Arc<KeySet> {
    let jwks: JwkSet = serde_json::from_value(json!({
        "keys": [{ "kty": "oct", "kid": KID, "alg": "HS256", "k": URL_SAFE_NO_PAD.encode(SECRET) }]
    }))
    .expect("jwks");
    Arc::new(KeySet::new(jwks))
}

/// `Authorization` header value for a token listing `authorities`.
pub fn bearer(authorities: &[&str]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_string());
    let claims = json!({ "sub": "it-user", "authorities": authorities });
    let token = encode(&header, &claims, &EncodingKey::from_secret(SECRET)).expect("token");
    format!("Bearer {token}")
}

/// Gateway state with registry synchronisation running.
pub fn gateway() -> AppState {
    let state = AppState::build(&GatewayServerConfig::default(), key_set()).expect("state");
    state.start_sync();
    state
}

pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = build_router(state.clone())
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request")
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Start a local upstream and return its base URL.
///
/// `GET /orders` echoes whether credential headers reached it, `GET /boom`
/// answers 500.
pub async fn upstream() -> String {
    let app = Router::new()
        .route(
            "/orders",
            get(|headers: axum::http::HeaderMap| async move {
                Json(json!({
                    "orders": [],
                    "saw_authorization": headers.contains_key("authorization"),
                    "saw_api_id": headers.contains_key("x-api-id"),
                }))
            }),
        )
        .route(
            "/boom",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database on fire") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}
