// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authenticate, Application, AuthScheme, LoginToken},
    state::AppState,
};

pub mod health;
pub mod identity;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/identity", get(identity::current_identity))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        identity::current_identity
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::ReadyChecks,
            identity::IdentityResponse,
            AuthScheme,
            LoginToken,
            Application
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Identity", description = "Resolved caller identity")
    )
)]
struct ApiDoc;
