// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::Request, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::identity::{get_capabilities, get_permissions, get_subject, get_token};
use crate::auth::{AuthScheme, Identity, LoginToken};

/// Identity the gateway resolved for the calling request.
#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub scheme: AuthScheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub permissions: Vec<String>,
    pub capabilities: Vec<String>,
    /// Login-token profile and grants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<LoginToken>,
}

/// Report the caller's resolved identity.
#[utoipa::path(
    get,
    path = "/v1/identity",
    tag = "Identity",
    responses(
        (status = 200, description = "Resolved identity", body = IdentityResponse),
        (status = 401, description = "Missing or invalid token", body = String, content_type = "text/plain")
    )
)]
pub async fn current_identity(request: Request) -> Json<IdentityResponse> {
    let extensions = request.extensions();
    let scheme = extensions
        .get::<Identity>()
        .map(|identity| identity.scheme)
        .unwrap_or_default();

    Json(IdentityResponse {
        scheme,
        subject: get_subject(extensions).map(str::to_owned),
        permissions: get_permissions(extensions).to_vec(),
        capabilities: get_capabilities(extensions).to_vec(),
        token: get_token(extensions).cloned(),
    })
}
