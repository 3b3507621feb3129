// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use admin_auth_gateway::{
    api::router,
    config::AppConfig,
    state::AppState,
    telemetry::{init_tracing, install_metrics_recorder},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    let mut state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build application state");
            return ExitCode::FAILURE;
        }
    };
    if let Some(handle) = install_metrics_recorder() {
        state = state.with_metrics(handle);
    }

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        %addr,
        server_name = %config.server_name,
        auth_enforced = config.auth.enforced,
        sat_keys_url = %config.auth.sat_keys_url,
        "Admin auth gateway listening (docs at /docs)"
    );

    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
