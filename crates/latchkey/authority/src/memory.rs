//! In-process authority provider
//!
//! Keeps installations, files and minted tokens in memory. Used by the
//! test suites and for running the daemon without a GitHub App. Expired
//! tokens are dropped on the next mint, and calls are only kept by a
//! provider built with [`InMemoryAuthorityProvider::recording`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use latchkey_types::{Authority, PermissionSet, ResourceId};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::ProviderError;
use crate::provider::{AuthorityProvider, MintedToken};

/// A call made against the provider, recorded in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    Installation(ResourceId),
    Mint {
        installation_id: u64,
        repo: ResourceId,
        permissions: PermissionSet,
    },
    ReadFile {
        repo: ResourceId,
        path: String,
    },
}

pub struct InMemoryAuthorityProvider {
    installations: RwLock<HashMap<ResourceId, Authority>>,
    files: RwLock<HashMap<(ResourceId, String), Vec<u8>>>,
    /// token value -> repository it was minted for, and its expiry
    minted: RwLock<HashMap<String, (ResourceId, DateTime<Utc>)>>,
    token_lifetime: Duration,
    calls: Option<Mutex<Vec<ProviderCall>>>,
    counter: AtomicU64,
    fail_minting: AtomicBool,
}

impl InMemoryAuthorityProvider {
    pub fn new() -> Self {
        Self {
            installations: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            minted: RwLock::new(HashMap::new()),
            token_lifetime: Duration::hours(1),
            calls: None,
            counter: AtomicU64::new(0),
            fail_minting: AtomicBool::new(false),
        }
    }

    /// A provider that keeps every call for [`calls`](Self::calls)
    pub fn recording() -> Self {
        Self {
            calls: Some(Mutex::new(Vec::new())),
            ..Self::new()
        }
    }

    /// Lifetime of minted tokens
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Number of minted tokens still held
    pub fn live_tokens(&self) -> usize {
        self.minted.read().map(|minted| minted.len()).unwrap_or_default()
    }

    /// Grant the broker `authority` over `repo`
    pub fn install(&self, repo: ResourceId, authority: Authority) {
        if let Ok(mut installations) = self.installations.write() {
            installations.insert(repo, authority);
        }
    }

    /// Place a file inside `repo`
    pub fn put_file(&self, repo: ResourceId, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert((repo, path.into()), content.into());
        }
    }

    /// Make every subsequent mint fail with a 500 from the authority
    pub fn fail_minting(&self, fail: bool) {
        self.fail_minting.store(fail, Ordering::SeqCst);
    }

    /// Calls received so far; always empty unless recording
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls
            .as_ref()
            .and_then(|calls| calls.lock().ok().map(|calls| calls.clone()))
            .unwrap_or_default()
    }

    fn record(&self, call: ProviderCall) {
        if let Some(Ok(mut calls)) = self.calls.as_ref().map(|calls| calls.lock()) {
            calls.push(call);
        }
    }
}

impl Default for InMemoryAuthorityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error() -> ProviderError {
    ProviderError::InvalidResponse("in-memory provider lock poisoned".to_string())
}

#[async_trait]
impl AuthorityProvider for InMemoryAuthorityProvider {
    async fn installation(&self, repo: &ResourceId) -> Result<Option<Authority>, ProviderError> {
        self.record(ProviderCall::Installation(repo.clone()));
        let installations = self.installations.read().map_err(|_| lock_error())?;
        Ok(installations.get(repo).cloned())
    }

    async fn mint_token(
        &self,
        installation_id: u64,
        repo: &ResourceId,
        permissions: &PermissionSet,
    ) -> Result<MintedToken, ProviderError> {
        self.record(ProviderCall::Mint {
            installation_id,
            repo: repo.clone(),
            permissions: permissions.clone(),
        });

        if self.fail_minting.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                status: 500,
                message: "mint unavailable".to_string(),
            });
        }

        let installed = self
            .installations
            .read()
            .map_err(|_| lock_error())?
            .get(repo)
            .map(|authority| authority.installation_id);
        if installed != Some(installation_id) {
            return Err(ProviderError::Status {
                status: 422,
                message: format!("installation {} does not cover {}", installation_id, repo),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("ghs_memory_{:04}", n);
        let now = Utc::now();
        let expires_at = now + self.token_lifetime;
        {
            let mut minted = self.minted.write().map_err(|_| lock_error())?;
            minted.retain(|_, (_, expiry)| *expiry > now);
            minted.insert(token.clone(), (repo.clone(), expires_at));
        }

        Ok(MintedToken {
            token: SecretString::from(token),
            expires_at,
            permissions: permissions.clone(),
        })
    }

    async fn read_file(
        &self,
        repo: &ResourceId,
        path: &str,
        token: &SecretString,
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        self.record(ProviderCall::ReadFile {
            repo: repo.clone(),
            path: path.to_string(),
        });

        let now = Utc::now();
        let scoped_to = self
            .minted
            .read()
            .map_err(|_| lock_error())?
            .get(token.expose_secret())
            .filter(|(_, expiry)| *expiry > now)
            .map(|(scoped_to, _)| scoped_to.clone());
        if scoped_to.as_ref() != Some(repo) {
            return Err(ProviderError::Status {
                status: 401,
                message: "bad credentials".to_string(),
            });
        }

        let files = self.files.read().map_err(|_| lock_error())?;
        Ok(files.get(&(repo.clone(), path.to_string())).cloned())
    }
}
