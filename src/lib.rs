// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin Auth Gateway - request authentication for the admin API
//!
//! Every request under `/v1` is resolved to an identity from either a SAT
//! bearer token (RSA, keys fetched by `kid`) or a legacy HMAC login token.
//!
//! ## Modules
//!
//! - `api` - HTTP routes and OpenAPI document (Axum)
//! - `auth` - Token validation, key cache and middleware
//! - `config` - Environment configuration
//! - `telemetry` - Tracing and Prometheus metrics

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
pub mod telemetry;

#[cfg(test)]
mod test_support;
