// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw credential extraction.
//!
//! These helpers only locate credential strings. Absence is an empty string;
//! interpretation happens in [`super::sat`] and [`super::login`].
//!
//! A header that is present always yields its text, with bytes that are not
//! valid UTF-8 replaced, so an unreadable credential is still rejected
//! instead of being mistaken for no credential at all.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};

/// Default name of the login-token header and its fallback cookie.
pub const DEFAULT_LOGIN_TOKEN_NAME: &str = "token";

/// Read the `Authorization` header verbatim.
pub fn extract_sat_token(headers: &HeaderMap) -> String {
    header_value(headers, AUTHORIZATION.as_str()).unwrap_or_default()
}

/// Read the login token from header `name`, falling back to cookie `name`.
pub fn extract_login_token(headers: &HeaderMap, name: &str) -> String {
    header_value(headers, name)
        .or_else(|| cookie_value(headers, name))
        .unwrap_or_default()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .find_map(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.trim_matches('"').to_owned())
        })
}
