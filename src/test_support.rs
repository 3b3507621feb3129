// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: RSA test keys, a local key-distribution
//! server and token builders.
//!
//! This module is compiled only for the library's own tests, so the
//! integration tests under `tests/` keep their own server in
//! `tests/common`. Both load the same key material from `tests/fixtures`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use url::Url;

pub const PRIMARY_KEY_PEM: &str = include_str!("../tests/fixtures/sat_primary_key.pem");
pub const PRIMARY_X5C: &str = include_str!("../tests/fixtures/sat_primary_x5c.txt");
pub const ROTATED_KEY_PEM: &str = include_str!("../tests/fixtures/sat_rotated_key.pem");
pub const ROTATED_X5C: &str = include_str!("../tests/fixtures/sat_rotated_x5c.txt");

pub const LOGIN_SECRET: &[u8] = b"unit-test-login-secret";

pub const UNAVAILABLE_DELAY: Duration = Duration::from_millis(200);

/// Local key-distribution server serving `primary` and `rotated` keys.
///
/// `not-json` answers with an HTML page and `unavailable` with a 503 after
/// [`UNAVAILABLE_DELAY`]; any other id is a 404.
pub struct KeyServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl KeyServer {
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/keys", self.addr)).unwrap()
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn key_record(kid: &str, x5c: &str) -> Value {
    json!({
        "kty": "RSA",
        "e": "AQAB",
        "use": "sig",
        "kid": kid,
        "x5c": [x5c.trim()],
        "n": ""
    })
}

pub async fn serve_keys() -> KeyServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/keys/{kid}",
        get(move |Path(kid): Path<String>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                match kid.as_str() {
                    "primary" => Json(key_record(&kid, PRIMARY_X5C)).into_response(),
                    "rotated" => Json(key_record(&kid, ROTATED_X5C)).into_response(),
                    "not-json" => "<html>maintenance</html>".into_response(),
                    "unavailable" => {
                        tokio::time::sleep(UNAVAILABLE_DELAY).await;
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    }
                    _ => StatusCode::NOT_FOUND.into_response(),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    KeyServer { addr, hits }
}

/// Sign `claims` as an RS256 SAT token.
pub fn sign_sat(claims: &Value, kid: Option<&str>, key_pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_owned);
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(key_pem.as_bytes()).unwrap(),
    )
    .unwrap()
}

/// SAT claims that pass every validity rule.
pub fn valid_sat_claims() -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "jti": "sat-1",
        "iss": "sat-issuer",
        "exp": now + 3600,
        "iat": now - 60,
        "nbf": now - 60,
        "version": "1.0",
        "sub": "svc:config-admin",
        "aud": ["xconf"],
        "capabilities": ["x1:xconf:config:read", "x1:xconf:config:write"],
        "allowedResources": {
            "allowedPartners": ["comcast"],
            "allowedDeviceIds": ["dev-1"]
        }
    })
}

/// Sign `claims` as an HS256 login token with [`LOGIN_SECRET`].
pub fn sign_login(claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(LOGIN_SECRET),
    )
    .unwrap()
}
