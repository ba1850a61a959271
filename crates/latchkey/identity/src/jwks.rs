//! Signing key cache

use crate::error::IdentityError;
use crate::JWKS_PATH;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

type KeySet = HashMap<String, DecodingKey>;

/// Minimum time between two key set fetches for the same issuer
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

struct IssuerKeys {
    keys: KeySet,
    fetched_at: Instant,
}

enum Lookup {
    Found(DecodingKey),
    /// Unknown key id, but the set was fetched within the refresh interval
    Fresh,
    /// Unknown key id and the set may be refreshed
    Stale,
}

/// In-process cache of issuer signing keys, keyed by issuer then key id.
///
/// A miss on a key id re-fetches the issuer's whole key set, at most once
/// per refresh interval. Refreshes are serialized among themselves and run
/// outside the cache lock, so lookups of cached keys never wait on the
/// network. A failed fetch leaves the cached keys untouched.
pub struct KeyCache {
    client: reqwest::Client,
    refresh_interval: Duration,
    issuers: RwLock<HashMap<String, IssuerKeys>>,
    refresh: Mutex<()>,
}

impl KeyCache {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            issuers: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
        }
    }

    /// Override the minimum time between fetches for one issuer
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Look up the key `kid` published by `issuer`, refreshing on a miss
    pub async fn key_for(&self, issuer: &str, kid: &str) -> Result<DecodingKey, IdentityError> {
        match self.lookup(issuer, kid).await {
            Lookup::Found(key) => return Ok(key),
            Lookup::Fresh => return Err(IdentityError::UnknownKeyId(kid.to_string())),
            Lookup::Stale => {}
        }

        let _refresh = self.refresh.lock().await;

        // Another request may have refreshed while we waited.
        match self.lookup(issuer, kid).await {
            Lookup::Found(key) => return Ok(key),
            Lookup::Fresh => return Err(IdentityError::UnknownKeyId(kid.to_string())),
            Lookup::Stale => {}
        }

        let keys = self.fetch(issuer).await?;
        let found = keys.get(kid).cloned();
        self.issuers.write().await.insert(
            issuer.to_string(),
            IssuerKeys {
                keys,
                fetched_at: Instant::now(),
            },
        );

        found.ok_or_else(|| IdentityError::UnknownKeyId(kid.to_string()))
    }

    async fn lookup(&self, issuer: &str, kid: &str) -> Lookup {
        let issuers = self.issuers.read().await;
        let Some(entry) = issuers.get(issuer) else {
            return Lookup::Stale;
        };
        if let Some(key) = entry.keys.get(kid) {
            Lookup::Found(key.clone())
        } else if entry.fetched_at.elapsed() < self.refresh_interval {
            debug!(%kid, "Unknown key id, key set recently fetched");
            Lookup::Fresh
        } else {
            Lookup::Stale
        }
    }

    async fn fetch(&self, issuer: &str) -> Result<KeySet, IdentityError> {
        let url = jwks_url(issuer);
        debug!(%url, "Fetching signing keys");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::KeyFetch(format!(
                "{} responded with {}",
                url, status
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        let mut keys = KeySet::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => warn!(%kid, error = %err, "Skipping unusable signing key"),
            }
        }

        debug!(%url, count = keys.len(), "Loaded signing keys");
        Ok(keys)
    }
}

pub(crate) fn jwks_url(issuer: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), JWKS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_url() {
        assert_eq!(
            jwks_url("https://token.actions.githubusercontent.com"),
            "https://token.actions.githubusercontent.com/.well-known/jwks"
        );
        assert_eq!(
            jwks_url("http://127.0.0.1:9999/"),
            "http://127.0.0.1:9999/.well-known/jwks"
        );
    }
}
