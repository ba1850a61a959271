//! Latchkey Identity - workload identity verification
//!
//! A CI workload proves who it is with a signed identity token. This crate
//! checks that token against the signing keys its issuer publishes at
//! `<issuer>/.well-known/jwks` and hands back the asserted claims.
//!
//! Keys are cached in-process per issuer and re-fetched when a token names
//! a key id the cache has not seen, no more often than the refresh interval.

#![deny(unsafe_code)]

mod error;
mod jwks;
mod verifier;

pub use error::IdentityError;
pub use jwks::{KeyCache, DEFAULT_REFRESH_INTERVAL};
pub use verifier::{Claims, IdentityVerifier, VerifyOptions};

/// Path, relative to the issuer URL, where signing keys are published
pub const JWKS_PATH: &str = "/.well-known/jwks";

/// Issuer of GitHub Actions workload identity tokens
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";
