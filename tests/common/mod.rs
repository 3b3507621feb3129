// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by the integration tests.
//!
//! The key-distribution service is a local axum server bound to
//! `127.0.0.1:0`; it serves only public certificates and counts requests so
//! tests can assert on caching.
//!
//! The library's `test_support` module is `cfg(test)` and not visible here.
//! This server differs from it in two ways: it mounts keys under the
//! deployed `/sat/v2/keys` path, and it takes a response delay so
//! concurrent validations overlap a successful fetch. Key material comes
//! from the same `tests/fixtures` files.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use admin_auth_gateway::{
    api::router,
    auth::{AuthConfig, LoginTokenDecoder, SatKeyStore, SatValidator, ServerIdentity},
    state::AppState,
};
use axum::{
    extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use url::Url;

pub const PRIMARY_KEY_PEM: &str = include_str!("../fixtures/sat_primary_key.pem");
pub const PRIMARY_X5C: &str = include_str!("../fixtures/sat_primary_x5c.txt");
pub const ROTATED_KEY_PEM: &str = include_str!("../fixtures/sat_rotated_key.pem");
pub const ROTATED_X5C: &str = include_str!("../fixtures/sat_rotated_x5c.txt");

pub const LOGIN_SECRET: &[u8] = b"integration-login-secret";
pub const SERVER_NAME: &str = "gateway-test-1";

pub struct KeyServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl KeyServer {
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/sat/v2/keys", self.addr)).expect("key server url")
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a key server. `delay` is applied to every response so concurrent
/// validations overlap with the fetch.
pub async fn serve_keys(delay: Duration) -> KeyServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/sat/v2/keys/{kid}",
        get(move |Path(kid): Path<String>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                let x5c = match kid.as_str() {
                    "primary" => PRIMARY_X5C,
                    "rotated" => ROTATED_X5C,
                    _ => return StatusCode::NOT_FOUND.into_response(),
                };
                Json(json!({
                    "kty": "RSA",
                    "e": "AQAB",
                    "use": "sig",
                    "kid": kid,
                    "x5c": [x5c.trim()],
                    "n": ""
                }))
                .into_response()
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    KeyServer { addr, hits }
}

pub fn auth_config(server: &KeyServer, enforced: bool) -> AuthConfig {
    let keys = SatKeyStore::new(server.base_url()).expect("http client");
    AuthConfig::new(SatValidator::new(keys), LoginTokenDecoder::new(LOGIN_SECRET))
        .with_enforcement(enforced)
}

pub fn app(auth: AuthConfig) -> Router {
    let state = AppState::new(auth)
        .with_server_identity(ServerIdentity::new("admin-auth-gateway/it", SERVER_NAME));
    router(state)
}

pub fn sign_sat(claims: &Value, kid: &str, key_pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(key_pem.as_bytes()).expect("rsa key");
    encode(&header, claims, &key).expect("sign sat")
}

pub fn sat_claims(partners: &[&str]) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "jti": "it-sat",
        "iss": "sat-issuer",
        "exp": now + 600,
        "iat": now - 10,
        "nbf": now - 10,
        "sub": "svc:deploy-bot",
        "aud": "xconf",
        "capabilities": ["x1:xconf:firmware:write"],
        "allowedResources": {"allowedPartners": partners}
    })
}

pub fn sign_login(claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(LOGIN_SECRET),
    )
    .expect("sign login")
}
