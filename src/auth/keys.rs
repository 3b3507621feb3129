// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SAT signing-key fetching and caching.
//!
//! The key-distribution service publishes one key record per key id at
//! `{base}/{kid}`. Only the first `x5c` certificate of a record is used.
//!
//! ## Caching
//!
//! - Keys are cached per `kid` with a configurable TTL
//! - Concurrent misses for the same `kid` share a single fetch and its outcome
//! - A failed fetch is not cached and not retried
//! - Entries can be dropped explicitly for key rotation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell, RwLock};
use url::Url;

use super::AuthError;

/// Default key cache TTL (1 hour).
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Histogram recording key-fetch latency in seconds, labeled by `outcome`.
pub const KEY_FETCH_HISTOGRAM: &str = "sat_key_fetch_duration_seconds";

/// Key record returned by the key-distribution service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyRecord {
    pub kty: String,
    pub e: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub x5c: Vec<String>,
    pub n: String,
}

impl KeyRecord {
    /// Parse the first `x5c` certificate as an RSA public key.
    pub fn rsa_key(&self) -> Result<DecodingKey, AuthError> {
        let cert = self
            .x5c
            .first()
            .ok_or_else(|| AuthError::KeyFormatInvalid("x5c is empty".to_string()))?;

        let der = STANDARD
            .decode(cert.trim())
            .map_err(|e| AuthError::KeyNotRsa(e.to_string()))?;
        let pem = pem::encode(&pem::Pem::new("CERTIFICATE", der));

        DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::KeyNotRsa(e.to_string()))
    }
}

/// Outcome of one fetch, shared by every caller waiting on it.
type Flight = OnceCell<Result<DecodingKey, AuthError>>;

/// Key cache entry.
struct CacheEntry {
    key: DecodingKey,
    fetched_at: Instant,
}

/// SAT key store with caching.
#[derive(Clone)]
pub struct SatKeyStore {
    /// Key-distribution base URL
    base_url: Url,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached keys by kid
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    /// In-progress fetches by kid
    inflight: Arc<Mutex<HashMap<String, Arc<Flight>>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl SatKeyStore {
    /// Create a key store fetching from `base_url`.
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url,
            cache_ttl: DEFAULT_KEY_CACHE_TTL,
            cache: Arc::new(RwLock::new(HashMap::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve the verification key for `kid`, fetching it on a cache miss.
    ///
    /// Concurrent misses for the same `kid` wait on one fetch and all receive
    /// its outcome, including a failure.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let url = self.key_url(kid)?;

        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        let flight = self.flight(kid).await;
        let result = flight
            .get_or_init(|| async move {
                // A previous flight may have filled the entry since our lookup.
                if let Some(key) = self.cached(kid).await {
                    return Ok(key);
                }
                let result = self.fetch_and_record(kid, url).await;
                if let Ok(key) = &result {
                    self.cache.write().await.insert(
                        kid.to_string(),
                        CacheEntry {
                            key: key.clone(),
                            fetched_at: Instant::now(),
                        },
                    );
                }
                result
            })
            .await
            .clone();

        let mut inflight = self.inflight.lock().await;
        if inflight.get(kid).is_some_and(|f| Arc::ptr_eq(f, &flight)) {
            inflight.remove(kid);
        }

        result
    }

    /// Check if a fresh key for `kid` is cached.
    pub async fn is_cached(&self, kid: &str) -> bool {
        self.cached(kid).await.is_some()
    }

    /// Number of cached entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop the cached key for `kid`; the next use refetches it.
    pub async fn invalidate(&self, kid: &str) -> bool {
        self.cache.write().await.remove(kid).is_some()
    }

    /// Drop every cached key.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    async fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache
            .get(kid)
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.key.clone())
    }

    async fn flight(&self, kid: &str) -> Arc<Flight> {
        let mut inflight = self.inflight.lock().await;
        inflight.entry(kid.to_string()).or_default().clone()
    }

    async fn fetch_and_record(&self, kid: &str, url: Url) -> Result<DecodingKey, AuthError> {
        let started = Instant::now();
        let result = self.fetch_key(url).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::histogram!(KEY_FETCH_HISTOGRAM, "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => tracing::info!(kid, "Fetched SAT signing key"),
            Err(e) => tracing::warn!(kid, error = %e, "SAT signing key fetch failed"),
        }
        result
    }

    /// Fetch and parse the key record at `url`.
    async fn fetch_key(&self, url: Url) -> Result<DecodingKey, AuthError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetchFailed(format!(
                "HTTP {} from key endpoint",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))?;

        let record: KeyRecord =
            serde_json::from_slice(&body).map_err(|e| AuthError::KeyFormatInvalid(e.to_string()))?;

        record.rsa_key()
    }

    /// `{base}/{kid}` with `kid` escaped as a single path segment.
    ///
    /// Empty and dot-segment ids cannot name a key and are refused.
    fn key_url(&self, kid: &str) -> Result<Url, AuthError> {
        if matches!(kid, "" | "." | "..") {
            return Err(AuthError::MissingKeyId);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AuthError::KeyFetchFailed(format!("cannot append key id to {}", self.base_url))
            })?
            .pop_if_empty()
            .push(kid);
        Ok(url)
    }
}
