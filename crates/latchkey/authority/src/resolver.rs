//! Authority resolution

use latchkey_types::{Authority, ResourceId};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AuthorityError;
use crate::provider::AuthorityProvider;

/// Finds the delegated grant the broker holds over a target repository
pub struct AuthorityResolver {
    provider: Arc<dyn AuthorityProvider>,
}

impl AuthorityResolver {
    pub fn new(provider: Arc<dyn AuthorityProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the broker's authority over `target`.
    ///
    /// Every failure, including a downstream error, is reported as "no
    /// authority" so callers cannot learn whether a repository exists.
    pub async fn resolve(&self, target: &ResourceId) -> Result<Authority, AuthorityError> {
        match self.provider.installation(target).await {
            Ok(Some(authority)) => {
                debug!(
                    %target,
                    installation_id = authority.installation_id,
                    permissions = %authority.permissions,
                    "Resolved authority"
                );
                Ok(authority)
            }
            Ok(None) => Err(AuthorityError {
                repo: target.clone(),
                cause: None,
            }),
            Err(err) => {
                warn!(%target, error = %err, "Authority lookup failed");
                Err(AuthorityError {
                    repo: target.clone(),
                    cause: Some(err),
                })
            }
        }
    }
}
