// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy login-token decoding.
//!
//! Login tokens are HMAC-signed with a shared secret. Once the signature is
//! verified every claim is read leniently: a missing claim, or one with an
//! unexpected JSON shape, leaves the field at its zero value instead of
//! failing the decode.

use jsonwebtoken::{
    decode, decode_header, get_current_timestamp, Algorithm, DecodingKey, Validation,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A decoded, verified login token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginToken {
    #[serde(rename = "iss", deserialize_with = "lenient")]
    pub issuer: String,
    #[serde(rename = "sub", deserialize_with = "lenient")]
    pub subject: String,
    /// First audience entry when the claim is a list
    #[serde(rename = "aud", deserialize_with = "first_audience")]
    pub audience: String,
    #[serde(rename = "iat", deserialize_with = "timestamp")]
    pub issued_at: i64,
    #[serde(rename = "exp", deserialize_with = "timestamp")]
    pub expires_at: i64,
    #[serde(rename = "nbf", deserialize_with = "timestamp")]
    pub not_before: i64,
    #[serde(rename = "jti", deserialize_with = "lenient")]
    pub jwt_id: String,
    #[serde(deserialize_with = "lenient")]
    pub display_name: String,
    #[serde(deserialize_with = "lenient")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient")]
    pub partner_id: String,
    #[serde(deserialize_with = "lenient")]
    pub email: String,
    #[serde(rename = "application", deserialize_with = "applications")]
    pub applications: Vec<Application>,
}

/// One application grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Application {
    /// Application id the grant is keyed by
    pub id: String,
    pub role: String,
    pub partner: String,
    pub rights: Vec<String>,
}

impl LoginToken {
    /// Union of every application's rights, first occurrence order.
    pub fn permissions(&self) -> Vec<String> {
        let mut permissions: Vec<String> = Vec::new();
        for right in self.applications.iter().flat_map(|app| &app.rights) {
            if !permissions.contains(right) {
                permissions.push(right.clone());
            }
        }
        permissions
    }
}

/// Verifies login tokens against the shared secret.
#[derive(Clone)]
pub struct LoginTokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl LoginTokenDecoder {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Temporal claims are checked by `check_timestamps`, which ignores
        // values that are not NumericDates.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify `raw` and map its claims into a [`LoginToken`].
    pub fn validate_and_decode(&self, raw: &str) -> Result<LoginToken, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        decode_header(raw).map_err(|_| AuthError::MalformedToken)?;

        let data = decode::<Map<String, Value>>(raw, &self.key, &self.validation)
            .map_err(|e| AuthError::from_decode(&e))?;
        check_timestamps(&data.claims, get_current_timestamp())?;

        serde_json::from_value(Value::Object(data.claims)).map_err(|_| AuthError::ClaimsUnreadable)
    }
}

/// Reject expired or not-yet-valid tokens, allowing [`CLOCK_SKEW_LEEWAY`].
///
/// Only non-negative numeric `exp` / `nbf` values are enforced.
fn check_timestamps(claims: &Map<String, Value>, now: u64) -> Result<(), AuthError> {
    let numeric_date = |name: &str| {
        claims.get(name).and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        })
    };

    if numeric_date("exp").is_some_and(|exp| exp < now.saturating_sub(CLOCK_SKEW_LEEWAY)) {
        return Err(AuthError::TokenExpired);
    }
    if numeric_date("nbf").is_some_and(|nbf| nbf > now + CLOCK_SKEW_LEEWAY) {
        return Err(AuthError::TokenNotYetValid);
    }
    Ok(())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or_default())
}

fn first_audience<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let audience = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .next()
            .and_then(|first| match first {
                Value::String(s) => Some(s),
                _ => None,
            })
            .unwrap_or_default(),
        _ => String::new(),
    };
    Ok(audience)
}

fn applications<'de, D>(deserializer: D) -> Result<Vec<Application>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(grants) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    let mut applications = Vec::new();
    for (id, records) in grants {
        let Value::Array(records) = records else {
            continue;
        };
        for record in records {
            let Value::Object(record) = record else {
                continue;
            };
            applications.push(Application {
                id: id.clone(),
                role: string_field(&record, "role"),
                partner: string_field(&record, "partner"),
                rights: record
                    .get("rights")
                    .and_then(Value::as_array)
                    .map(|rights| {
                        rights
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default(),
            });
        }
    }
    Ok(applications)
}

fn string_field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &[u8] = b"login-token-test-secret";

    fn sign(claims: &Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn decoder() -> LoginTokenDecoder {
        LoginTokenDecoder::new(SECRET)
    }

    #[test]
    fn blank_token_is_empty() {
        assert!(matches!(
            decoder().validate_and_decode("   "),
            Err(AuthError::EmptyToken)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decoder().validate_and_decode("not-a-token"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn wrong_secret_is_signature_invalid() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "alice"}),
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();
        assert!(matches!(
            decoder().validate_and_decode(&token),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn non_map_payload_is_unreadable() {
        let token = sign(&json!(["not", "a", "map"]));
        assert!(matches!(
            decoder().validate_and_decode(&token),
            Err(AuthError::ClaimsUnreadable)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(&json!({"sub": "alice", "exp": 1_000}));
        assert!(matches!(
            decoder().validate_and_decode(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn future_not_before_is_rejected() {
        let nbf = get_current_timestamp() + 3600;
        let token = sign(&json!({"sub": "alice", "nbf": nbf}));
        assert!(matches!(
            decoder().validate_and_decode(&token),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn timestamps_within_leeway_are_accepted() {
        let now = get_current_timestamp();
        let token = sign(&json!({"sub": "alice", "exp": now - 30, "nbf": now + 30}));
        assert_eq!(decoder().validate_and_decode(&token).unwrap().subject, "alice");
    }

    #[test]
    fn mismatched_temporal_claims_are_ignored() {
        for claims in [
            json!({"sub": "alice", "exp": "soon"}),
            json!({"sub": "alice", "nbf": "later"}),
            json!({"sub": "alice", "exp": -5}),
            json!({"sub": "alice", "exp": null, "nbf": [1]}),
        ] {
            let decoded = decoder().validate_and_decode(&sign(&claims)).unwrap();
            assert_eq!(decoded.subject, "alice");
        }

        let decoded = decoder()
            .validate_and_decode(&sign(&json!({"exp": -5})))
            .unwrap();
        assert_eq!(decoded.expires_at, -5);
    }

    #[test]
    fn empty_claim_set_decodes_to_zero_values() {
        let token = sign(&json!({}));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded, LoginToken::default());
        assert!(decoded.permissions().is_empty());
    }

    #[test]
    fn profile_claims_are_mapped() {
        let token = sign(&json!({
            "iss": "login-service",
            "sub": "alice",
            "aud": "admin-ui",
            "iat": 1_700_000_000,
            "jti": "j-1",
            "displayName": "Alice A.",
            "firstName": "Alice",
            "lastName": "Anders",
            "partnerId": "partner-9",
            "email": "alice@example.com"
        }));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.issuer, "login-service");
        assert_eq!(decoded.subject, "alice");
        assert_eq!(decoded.audience, "admin-ui");
        assert_eq!(decoded.issued_at, 1_700_000_000);
        assert_eq!(decoded.jwt_id, "j-1");
        assert_eq!(decoded.display_name, "Alice A.");
        assert_eq!(decoded.first_name, "Alice");
        assert_eq!(decoded.last_name, "Anders");
        assert_eq!(decoded.partner_id, "partner-9");
        assert_eq!(decoded.email, "alice@example.com");
    }

    #[test]
    fn audience_list_keeps_first_entry() {
        let token = sign(&json!({"aud": ["partnerA", "partnerB"]}));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.audience, "partnerA");
    }

    #[test]
    fn audience_list_with_non_string_head_is_empty() {
        let token = sign(&json!({"aud": [7, "partnerB"]}));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.audience, "");
    }

    #[test]
    fn mismatched_claim_types_are_zeroed() {
        let token = sign(&json!({
            "sub": 42,
            "email": ["a@b"],
            "iat": "yesterday",
            "application": "everything"
        }));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.subject, "");
        assert_eq!(decoded.email, "");
        assert_eq!(decoded.issued_at, 0);
        assert!(decoded.applications.is_empty());
    }

    #[test]
    fn application_grants_and_permissions() {
        let token = sign(&json!({
            "application": {"appX": [{"role": "admin", "rights": ["r1", "r2"]}]}
        }));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.applications.len(), 1);
        let app = &decoded.applications[0];
        assert_eq!(app.id, "appX");
        assert_eq!(app.role, "admin");
        assert_eq!(app.partner, "");
        assert_eq!(app.rights, vec!["r1", "r2"]);
        assert_eq!(decoded.permissions(), vec!["r1", "r2"]);
    }

    #[test]
    fn malformed_grant_records_are_skipped() {
        let token = sign(&json!({
            "application": {
                "appA": ["junk", {"role": "viewer", "partner": "p1", "rights": ["read", 5]}],
                "appB": {"role": "ignored"},
                "appC": [{"rights": ["read", "write"]}]
            }
        }));
        let decoded = decoder().validate_and_decode(&token).unwrap();
        assert_eq!(decoded.applications.len(), 2);
        assert_eq!(decoded.applications[0].id, "appA");
        assert_eq!(decoded.applications[0].partner, "p1");
        assert_eq!(decoded.applications[0].rights, vec!["read"]);
        assert_eq!(decoded.applications[1].id, "appC");
        assert_eq!(decoded.applications[1].role, "");
        assert_eq!(decoded.permissions(), vec!["read", "write"]);
    }
}
