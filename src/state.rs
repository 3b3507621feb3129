// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::{AuthConfig, LoginTokenDecoder, SatKeyStore, SatValidator, ServerIdentity};
use crate::config::{AppConfig, ConfigError};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthConfig,
    pub server: ServerIdentity,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            server: ServerIdentity::default(),
            metrics: None,
        }
    }

    /// Build the state described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let keys = SatKeyStore::new(config.auth.sat_keys_url.clone())?
            .with_cache_ttl(config.auth.key_cache_ttl);

        let auth = AuthConfig::new(
            SatValidator::new(keys),
            LoginTokenDecoder::new(config.auth.login_token_secret.as_bytes()),
        )
        .with_login_token_name(config.auth.login_token_name.clone())
        .with_enforcement(config.auth.enforced);

        Ok(Self::new(auth).with_server_identity(ServerIdentity::new(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            &config.server_name,
        )))
    }

    pub fn with_server_identity(mut self, server: ServerIdentity) -> Self {
        self.server = server;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
