// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! ## Scheme selection
//!
//! 1. A SAT token in `Authorization` is validated; failure halts with 401
//!    and never falls back to the login token.
//! 2. Otherwise a login token (header, then cookie) is decoded; failure
//!    halts with 401.
//! 3. With no credential the request proceeds anonymously unless
//!    enforcement is on.
//!
//! # Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/v1/identity", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), authenticate));
//! ```

use axum::{
    extract::{Request, State},
    http::{header::SERVER, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use super::extract::{extract_login_token, extract_sat_token, DEFAULT_LOGIN_TOKEN_NAME};
use super::{AuthRejection, Identity, LoginTokenDecoder, SatValidator};
use crate::state::AppState;

/// Response header naming the host that served the request.
pub const SERVER_NAME_HEADER: HeaderName = HeaderName::from_static("x-server-name");
/// Response header carrying the resolved subject.
pub const AUTH_SUBJECT_HEADER: HeaderName = HeaderName::from_static("x-auth-subject");

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// SAT bearer-token validator
    pub sat: SatValidator,
    /// Login-token decoder
    pub login: LoginTokenDecoder,
    /// Login-token header and cookie name
    pub login_token_name: String,
    /// Reject requests that carry no credential
    pub enforced: bool,
}

impl AuthConfig {
    pub fn new(sat: SatValidator, login: LoginTokenDecoder) -> Self {
        Self {
            sat,
            login,
            login_token_name: DEFAULT_LOGIN_TOKEN_NAME.to_string(),
            enforced: true,
        }
    }

    pub fn with_login_token_name(mut self, name: impl Into<String>) -> Self {
        self.login_token_name = name.into();
        self
    }

    pub fn with_enforcement(mut self, enforced: bool) -> Self {
        self.enforced = enforced;
        self
    }

    /// Resolve the identity for a request's headers.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Identity, AuthRejection> {
        let sat_token = extract_sat_token(headers);
        if !sat_token.is_empty() {
            return match self.sat.validate(&sat_token).await {
                Ok(claims) => Ok(Identity::from_sat(claims)),
                Err(e) => {
                    tracing::warn!(error = %e, code = e.error_code(), "SAT token rejected");
                    Err(AuthRejection::InvalidSatToken)
                }
            };
        }

        let login_token = extract_login_token(headers, &self.login_token_name);
        if !login_token.is_empty() {
            return match self.login.validate_and_decode(&login_token) {
                Ok(token) => Ok(Identity::from_login(token)),
                Err(e) => {
                    tracing::warn!(error = %e, code = e.error_code(), "Login token rejected");
                    Err(AuthRejection::InvalidLoginToken)
                }
            };
        }

        if self.enforced {
            tracing::warn!("No auth token presented");
            Err(AuthRejection::TokenNotFound)
        } else {
            tracing::debug!("No auth token presented, proceeding anonymously");
            Ok(Identity::anonymous())
        }
    }
}

/// Identification headers stamped on every authenticated response.
#[derive(Clone, Debug)]
pub struct ServerIdentity {
    product: HeaderValue,
    server_name: HeaderValue,
}

impl ServerIdentity {
    /// Values that are not valid header text are replaced with `unknown`.
    pub fn new(product: &str, server_name: &str) -> Self {
        let value = |s: &str| {
            HeaderValue::from_str(s).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        };
        Self {
            product: value(product),
            server_name: value(server_name),
        }
    }

    fn apply(&self, headers: &mut HeaderMap, subject: Option<&str>) {
        headers.insert(SERVER, self.product.clone());
        headers.insert(SERVER_NAME_HEADER, self.server_name.clone());
        if let Some(value) = subject.and_then(|s| HeaderValue::from_str(s).ok()) {
            headers.insert(AUTH_SUBJECT_HEADER, value);
        }
    }
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self::new(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            "unknown",
        )
    }
}

/// Authentication middleware function.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        scheme = tracing::field::Empty,
    );

    async move {
        tracing::info!("Request started");

        let identity = match state.auth.resolve(request.headers()).await {
            Ok(identity) => identity,
            Err(rejection) => {
                tracing::info!(status = 401, "Request rejected");
                return rejection.into_response();
            }
        };
        tracing::Span::current().record("scheme", tracing::field::debug(identity.scheme));

        let subject = identity.subject.clone();
        request.extensions_mut().insert(identity);

        let mut response = next.run(request).await;
        state
            .server
            .apply(response.headers_mut(), subject.as_deref());

        tracing::info!(status = response.status().as_u16(), "Request finished");
        response
    }
    .instrument(span)
    .await
}
