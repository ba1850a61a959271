//! Latchkey Authority - what the broker itself is allowed to grant
//!
//! The broker acts as a GitHub App. Its standing credential (app id plus
//! private key) lets it ask which installation covers a repository and
//! mint installation tokens narrowed to a repository and a permission set.
//!
//! The downstream authority sits behind [`AuthorityProvider`] so the
//! pipeline can run against GitHub ([`GitHubAppProvider`]) or an
//! in-process stand-in ([`InMemoryAuthorityProvider`]).

#![deny(unsafe_code)]

mod error;
mod github;
mod issuer;
mod memory;
mod provider;
mod resolver;

pub use error::{AuthorityError, IssuanceError, ProviderError};
pub use github::{AppCredentials, GitHubAppProvider, GITHUB_API_URL};
pub use issuer::TokenIssuer;
pub use memory::{InMemoryAuthorityProvider, ProviderCall};
pub use provider::{AuthorityProvider, MintedToken};
pub use resolver::AuthorityResolver;
