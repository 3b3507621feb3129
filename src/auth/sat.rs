// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SAT bearer-token validation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::Value;

use super::claims::Claims;
use super::keys::SatKeyStore;
use super::AuthError;

/// Validates SAT tokens against keys from the key-distribution service.
#[derive(Clone)]
pub struct SatValidator {
    keys: SatKeyStore,
    validation: Validation,
}

impl SatValidator {
    pub fn new(keys: SatKeyStore) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
        // Temporal and issuer rules are enforced by `Claims::valid`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self { keys, validation }
    }

    pub fn keys(&self) -> &SatKeyStore {
        &self.keys
    }

    /// Verify `raw` (optionally prefixed with a scheme such as `Bearer`) and
    /// return its validated claims.
    pub async fn validate(&self, raw: &str) -> Result<Claims, AuthError> {
        let token = strip_scheme(raw);
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let kid = key_id(token)?;
        let key = self.keys.decoding_key(&kid).await?;

        let claims = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| AuthError::from_decode(&e))?
            .claims;

        claims
            .valid(chrono::Utc::now().timestamp())
            .map_err(AuthError::InvalidClaims)?;

        Ok(claims)
    }
}

/// Drop a leading scheme segment; with several segments only the second is kept.
fn strip_scheme(raw: &str) -> &str {
    let mut segments = raw.split(' ');
    let first = segments.next().unwrap_or_default();
    segments.next().unwrap_or(first).trim()
}

/// Read `kid` from the unverified token header.
fn key_id(token: &str) -> Result<String, AuthError> {
    let encoded = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|_| AuthError::MalformedToken)?;
    let header: Value = serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)?;

    header
        .get("kid")
        .and_then(Value::as_str)
        .filter(|kid| !kid.is_empty())
        .map(str::to_owned)
        .ok_or(AuthError::MissingKeyId)
}
