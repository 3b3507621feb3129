// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] carries the detailed reason a credential was refused and is
//! only ever logged. Callers see an [`AuthRejection`], which renders a fixed
//! plain-text 401 body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::claims::ClaimViolations;

/// Authentication error type.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Credential string is blank
    #[error("token is empty")]
    EmptyToken,
    /// Token is not a well-formed signed token
    #[error("token is malformed")]
    MalformedToken,
    /// Token header carries no string `kid`
    #[error("token header has no key id")]
    MissingKeyId,
    /// Key-distribution endpoint unreachable or returned non-2xx
    #[error("failed to fetch signing key: {0}")]
    KeyFetchFailed(String),
    /// Key-distribution response is not a key record
    #[error("signing key record is invalid: {0}")]
    KeyFormatInvalid(String),
    /// Key record certificate is not an RSA public key
    #[error("signing key is not an RSA public key: {0}")]
    KeyNotRsa(String),
    /// Token signature is invalid
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// Verified payload cannot be read as a claim set
    #[error("token claims are unreadable")]
    ClaimsUnreadable,
    /// Token has expired
    #[error("token has expired")]
    TokenExpired,
    /// Token is not yet valid
    #[error("token is not yet valid")]
    TokenNotYetValid,
    /// One or more claim rules failed
    #[error("token claims are invalid: {0}")]
    InvalidClaims(ClaimViolations),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::EmptyToken => "empty_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::KeyFetchFailed(_) => "key_fetch_failed",
            AuthError::KeyFormatInvalid(_) => "key_format_invalid",
            AuthError::KeyNotRsa(_) => "key_not_rsa",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimsUnreadable => "claims_unreadable",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidClaims(_) => "invalid_claims",
        }
    }

    /// Map a `jsonwebtoken` failure raised during verified decoding.
    pub(crate) fn from_decode(err: &jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => AuthError::ClaimsUnreadable,
            _ => AuthError::MalformedToken,
        }
    }
}

/// Middleware outcome that halts a request with a 401.
///
/// The body is one of three fixed messages; no detail from [`AuthError`]
/// reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// SAT bearer token presented but refused
    InvalidSatToken,
    /// Login token presented but refused
    InvalidLoginToken,
    /// No credential presented while enforcement is on
    TokenNotFound,
}

impl AuthRejection {
    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::InvalidSatToken => "invalid SAT token",
            AuthRejection::InvalidLoginToken => "invalid auth token",
            AuthRejection::TokenNotFound => "auth token not found",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.message()).into_response()
    }
}
