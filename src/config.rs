// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SAT_KEYS_URL` | Key-distribution base URL for SAT verification | Required |
//! | `LOGIN_TOKEN_SECRET` | Shared secret for login-token verification | Required |
//! | `LOGIN_TOKEN_NAME` | Login-token header and cookie name | `token` |
//! | `AUTH_ENFORCED` | Reject requests without any token | `true` |
//! | `SAT_KEY_CACHE_TTL_SECS` | Signing-key cache TTL | `3600` |
//! | `SERVER_NAME` | Value of the `X-Server-Name` header | `$HOSTNAME` or `unknown` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::extract::DEFAULT_LOGIN_TOKEN_NAME;
use crate::auth::keys::DEFAULT_KEY_CACHE_TTL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SAT_KEYS_URL_ENV: &str = "SAT_KEYS_URL";
/// Never logged.
pub const LOGIN_TOKEN_SECRET_ENV: &str = "LOGIN_TOKEN_SECRET";
pub const LOGIN_TOKEN_NAME_ENV: &str = "LOGIN_TOKEN_NAME";
pub const AUTH_ENFORCED_ENV: &str = "AUTH_ENFORCED";
pub const SAT_KEY_CACHE_TTL_ENV: &str = "SAT_KEY_CACHE_TTL_SECS";
pub const SERVER_NAME_ENV: &str = "SERVER_NAME";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Authentication settings.
#[derive(Clone)]
pub struct AuthSettings {
    pub sat_keys_url: Url,
    pub login_token_secret: String,
    pub login_token_name: String,
    pub enforced: bool,
    pub key_cache_ttl: Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("sat_keys_url", &self.sat_keys_url.as_str())
            .field("login_token_secret", &"<redacted>")
            .field("login_token_name", &self.login_token_name)
            .field("enforced", &self.enforced)
            .field("key_cache_ttl", &self.key_cache_ttl)
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub server_name: String,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                reason: format!("'{v}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let sat_keys_url = get(SAT_KEYS_URL_ENV).ok_or(ConfigError::Missing(SAT_KEYS_URL_ENV))?;
        let sat_keys_url = Url::parse(sat_keys_url.trim()).map_err(|e| ConfigError::Invalid {
            var: SAT_KEYS_URL_ENV,
            reason: e.to_string(),
        })?;
        if sat_keys_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                var: SAT_KEYS_URL_ENV,
                reason: "must be a hierarchical URL".to_string(),
            });
        }

        let login_token_secret =
            get(LOGIN_TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(LOGIN_TOKEN_SECRET_ENV))?;

        let enforced = match get(AUTH_ENFORCED_ENV) {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                var: AUTH_ENFORCED_ENV,
                reason: format!("'{v}' is not a boolean"),
            })?,
            None => true,
        };

        let key_cache_ttl = match get(SAT_KEY_CACHE_TTL_ENV) {
            Some(v) => Duration::from_secs(v.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    var: SAT_KEY_CACHE_TTL_ENV,
                    reason: format!("'{v}' is not a number of seconds"),
                }
            })?),
            None => DEFAULT_KEY_CACHE_TTL,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            server_name: get(SERVER_NAME_ENV)
                .or_else(|| get("HOSTNAME"))
                .unwrap_or_else(|| "unknown".to_string()),
            log_format,
            auth: AuthSettings {
                sat_keys_url,
                login_token_secret,
                login_token_name: get(LOGIN_TOKEN_NAME_ENV)
                    .unwrap_or_else(|| DEFAULT_LOGIN_TOKEN_NAME.to_string()),
                enforced,
                key_cache_ttl,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
