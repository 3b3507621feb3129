// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Resolves every request to an [`Identity`] before admin handlers run.
//!
//! ## Auth Flow
//!
//! 1. `Authorization: Bearer <SAT>`:
//!    - `kid` read from the unverified header
//!    - RSA key fetched from `{SAT_KEYS_URL}/{kid}` (cached per `kid`)
//!    - Signature verified, claims checked (issuer, expiry, not-before,
//!      issued-at, allowed partners)
//!    - Identity carries the SAT capabilities
//! 2. Otherwise, login token from the `token` header or cookie:
//!    - HMAC signature verified with the shared secret
//!    - Profile and application grants decoded leniently
//!    - Identity carries the token and its flattened rights
//! 3. Otherwise anonymous, or 401 when enforcement is on
//!
//! ## Security
//!
//! - The two schemes never mix: a rejected SAT token is never retried as a
//!   login token
//! - Rejections carry a fixed message; details are only logged
//! - Tokens are never logged

pub mod claims;
pub mod error;
pub mod extract;
pub mod identity;
pub mod keys;
pub mod login;
pub mod middleware;
pub mod sat;

pub use claims::{AllowedResources, ClaimRule, ClaimViolations, Claims};
pub use error::{AuthError, AuthRejection};
pub use identity::{AuthScheme, Identity};
pub use keys::SatKeyStore;
pub use login::{Application, LoginToken, LoginTokenDecoder};
pub use middleware::{authenticate, AuthConfig, ServerIdentity};
pub use sat::SatValidator;
