//! Final token issuance

use latchkey_types::{Authority, IssuedToken, PermissionSet, ResourceId};
use std::sync::Arc;
use tracing::info;

use crate::error::IssuanceError;
use crate::provider::AuthorityProvider;

/// Mints the token handed back to the caller
pub struct TokenIssuer {
    provider: Arc<dyn AuthorityProvider>,
}

impl TokenIssuer {
    pub fn new(provider: Arc<dyn AuthorityProvider>) -> Self {
        Self { provider }
    }

    /// Mint a token scoped to exactly `target` and `permissions`.
    ///
    /// `permissions` must not be empty; an empty set here means an earlier
    /// stage let a denied request through.
    pub async fn issue(
        &self,
        target: &ResourceId,
        authority: &Authority,
        permissions: &PermissionSet,
    ) -> Result<IssuedToken, IssuanceError> {
        if permissions.is_empty() {
            return Err(IssuanceError::NoPermissionsRequested);
        }

        let minted = self
            .provider
            .mint_token(authority.installation_id, target, permissions)
            .await?;

        info!(
            %target,
            installation_id = authority.installation_id,
            permissions = %minted.permissions,
            expires_at = %minted.expires_at,
            "Issued access token"
        );

        Ok(IssuedToken {
            repo: target.clone(),
            token: minted.token,
            expires_at: minted.expires_at,
            permissions: minted.permissions,
        })
    }
}
