//! Downstream authority seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use latchkey_types::{Authority, PermissionSet, ResourceId};
use secrecy::SecretString;

use crate::error::ProviderError;

/// A freshly minted installation token
#[derive(Debug)]
pub struct MintedToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    /// Permissions the authority reports as attached to the token
    pub permissions: PermissionSet,
}

/// The three operations the broker needs from the downstream authority
#[async_trait]
pub trait AuthorityProvider: Send + Sync {
    /// Installation (and its granted permissions) covering `repo`, if any
    async fn installation(&self, repo: &ResourceId) -> Result<Option<Authority>, ProviderError>;

    /// Mint a token limited to `repo` and exactly `permissions`
    async fn mint_token(
        &self,
        installation_id: u64,
        repo: &ResourceId,
        permissions: &PermissionSet,
    ) -> Result<MintedToken, ProviderError>;

    /// Read a file from `repo` using a repository-scoped token.
    ///
    /// `Ok(None)` means the file does not exist or is not readable with
    /// `token`.
    async fn read_file(
        &self,
        repo: &ResourceId,
        path: &str,
        token: &SecretString,
    ) -> Result<Option<Vec<u8>>, ProviderError>;
}
