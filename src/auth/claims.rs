// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SAT claims and their validity rules.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Claims carried by a SAT bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Token id
    #[serde(rename = "jti")]
    pub id: String,
    /// Issuer
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Expiration (epoch seconds)
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Issued at (epoch seconds)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Not before (epoch seconds)
    #[serde(rename = "nbf")]
    pub not_before: i64,
    pub version: String,
    #[serde(rename = "sub")]
    pub subject: String,
    /// Audience; a bare string is read as a one-element list
    #[serde(rename = "aud", deserialize_with = "string_or_list")]
    pub audience: Vec<String>,
    pub capabilities: Vec<String>,
    #[serde(rename = "allowedResources")]
    pub allowed_resources: AllowedResources,
}

/// Resource scoping carried by a SAT token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllowedResources {
    pub allowed_partners: Vec<String>,
    pub allowed_service_account_ids: Vec<String>,
    pub allowed_device_ids: Vec<String>,
    pub allowed_user_ids: Vec<String>,
    pub allowed_phone_numbers: Vec<String>,
}

/// A single failed claim rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimRule {
    MissingIssuer,
    Expired,
    NotYetValid,
    IssuedInFuture,
    NoAllowedPartners,
}

impl fmt::Display for ClaimRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ClaimRule::MissingIssuer => "token issuer is missing",
            ClaimRule::Expired => "token has already expired",
            ClaimRule::NotYetValid => "token is not valid yet",
            ClaimRule::IssuedInFuture => "token used before issued",
            ClaimRule::NoAllowedPartners => "token has no allowed partners",
        };
        f.write_str(msg)
    }
}

/// Every rule a claim set violated, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimViolations(Vec<ClaimRule>);

impl ClaimViolations {
    pub fn rules(&self) -> &[ClaimRule] {
        &self.0
    }

    pub fn contains(&self, rule: ClaimRule) -> bool {
        self.0.contains(&rule)
    }
}

impl fmt::Display for ClaimViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClaimViolations {}

impl Claims {
    /// Check every rule against `now` (epoch seconds).
    ///
    /// All rules are evaluated; the error lists each one that failed.
    pub fn valid(&self, now: i64) -> Result<(), ClaimViolations> {
        let mut violated = Vec::new();

        if self.issuer.is_empty() {
            violated.push(ClaimRule::MissingIssuer);
        }
        if self.expires_at <= now {
            violated.push(ClaimRule::Expired);
        }
        if self.not_before > now {
            violated.push(ClaimRule::NotYetValid);
        }
        if self.issued_at > now {
            violated.push(ClaimRule::IssuedInFuture);
        }
        if self.allowed_resources.allowed_partners.is_empty() {
            violated.push(ClaimRule::NoAllowedPartners);
        }

        if violated.is_empty() {
            Ok(())
        } else {
            Err(ClaimViolations(violated))
        }
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    pub fn has_device(&self, id: &str) -> bool {
        self.allowed_resources
            .allowed_device_ids
            .iter()
            .any(|d| d == id)
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}
