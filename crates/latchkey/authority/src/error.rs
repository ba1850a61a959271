//! Authority errors

use latchkey_types::ResourceId;
use thiserror::Error;

/// Failure talking to the downstream authority
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("authority responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unable to sign app token: {0}")]
    Jwt(String),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// The broker holds no delegated authority over a resource.
///
/// Deliberately does not say whether the resource exists.
#[derive(Debug, Error)]
#[error("no authority over {repo}")]
pub struct AuthorityError {
    pub repo: ResourceId,
    #[source]
    pub cause: Option<ProviderError>,
}

/// Failure minting the final scoped token
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// Issuance was called with an empty permission set. This is a bug in
    /// the caller, not something a client can cause.
    #[error("no permission requested")]
    NoPermissionsRequested,

    #[error("token mint failed: {0}")]
    Provider(#[from] ProviderError),
}
