//! Policy retrieval

use latchkey_authority::AuthorityProvider;
use latchkey_types::{Authority, PermissionLevel, PermissionSet, ResourceId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::document::AccessPolicy;

/// Where a repository keeps its access policy
pub const POLICY_PATH: &str = ".github/access.yaml";

/// Permission scope that allows reading individual configured files
const SINGLE_FILE_SCOPE: &str = "single_file";

/// Reads a target repository's access policy with a single-purpose token
pub struct PolicyFetcher {
    provider: Arc<dyn AuthorityProvider>,
    path: String,
}

impl PolicyFetcher {
    pub fn new(provider: Arc<dyn AuthorityProvider>) -> Self {
        Self::with_path(provider, POLICY_PATH)
    }

    pub fn with_path(provider: Arc<dyn AuthorityProvider>, path: impl Into<String>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetch and parse the policy of `target`.
    ///
    /// Returns `None` when the policy cannot be read or parsed for any
    /// reason. A repository without a policy simply has not opted in.
    pub async fn fetch(&self, target: &ResourceId, authority: &Authority) -> Option<AccessPolicy> {
        let read_only = PermissionSet::single(SINGLE_FILE_SCOPE, PermissionLevel::Read);

        let reader = match self
            .provider
            .mint_token(authority.installation_id, target, &read_only)
            .await
        {
            Ok(minted) => minted.token,
            Err(err) => {
                info!(%target, error = %err, "Unable to mint policy read token");
                return None;
            }
        };

        let content = match self.provider.read_file(target, &self.path, &reader).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(%target, path = %self.path, "No access policy");
                return None;
            }
            Err(err) => {
                info!(%target, path = %self.path, error = %err, "Unable to read access policy");
                return None;
            }
        };

        match AccessPolicy::from_yaml(&content) {
            Ok(policy) => {
                debug!(%target, rules = policy.rules.len(), "Loaded access policy");
                Some(policy)
            }
            Err(err) => {
                info!(%target, path = %self.path, error = %err, "Ignoring invalid access policy");
                None
            }
        }
    }
}
