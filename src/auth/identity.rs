// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped identity.
//!
//! The auth middleware stores exactly one [`Identity`] in the request
//! extensions. Handlers read it either through the extractor:
//!
//! ```rust,ignore
//! async fn handler(identity: Identity) -> impl IntoResponse {
//!     // identity.capabilities, identity.permissions, ...
//! }
//! ```
//!
//! or through the accessor functions, which fall back to empty values.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::claims::Claims;
use super::login::LoginToken;

/// Credential scheme an identity was resolved from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Sat,
    Login,
    #[default]
    Anonymous,
}

/// Identity resolved for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    pub scheme: AuthScheme,
    /// Resolved subject, echoed in the subject response header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Decoded login token (login scheme only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<LoginToken>,
    /// Rights granted by the login token
    pub permissions: Vec<String>,
    /// Capabilities granted by the SAT token
    pub capabilities: Vec<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_sat(claims: Claims) -> Self {
        Self {
            scheme: AuthScheme::Sat,
            subject: non_empty(claims.subject),
            capabilities: claims.capabilities,
            ..Self::default()
        }
    }

    pub fn from_login(token: LoginToken) -> Self {
        Self {
            scheme: AuthScheme::Login,
            subject: non_empty(token.subject.clone()),
            permissions: token.permissions(),
            token: Some(token),
            ..Self::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.scheme == AuthScheme::Anonymous
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn identity(extensions: &Extensions) -> Option<&Identity> {
    let identity = extensions.get::<Identity>();
    if identity.is_none() {
        tracing::debug!("No identity in request extensions");
    }
    identity
}

/// Login token of the current request, if one was presented.
pub fn get_token(extensions: &Extensions) -> Option<&LoginToken> {
    let token = identity(extensions).and_then(|id| id.token.as_ref());
    if token.is_none() {
        tracing::debug!("No login token in request identity");
    }
    token
}

/// Login-token permissions of the current request.
pub fn get_permissions(extensions: &Extensions) -> &[String] {
    match identity(extensions) {
        Some(id) => &id.permissions,
        None => &[],
    }
}

/// SAT capabilities of the current request.
pub fn get_capabilities(extensions: &Extensions) -> &[String] {
    match identity(extensions) {
        Some(id) => &id.capabilities,
        None => &[],
    }
}

pub fn get_subject(extensions: &Extensions) -> Option<&str> {
    identity(extensions).and_then(|id| id.subject.as_deref())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(identity(&parts.extensions).cloned().unwrap_or_default())
    }
}
