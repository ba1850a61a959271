//! Identity token verification

use crate::error::IdentityError;
use crate::jwks::KeyCache;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use latchkey_types::ResourceId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signature algorithms an issuer may use. Symmetric algorithms are never
/// accepted since the verification key is public.
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// How to check an assertion
#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// Expected `iss` claim; keys are fetched from under this URL
    pub issuer: String,
    /// Skip the expiry check. Debug-only, never enabled in production.
    pub allow_expired: bool,
}

impl VerifyOptions {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            allow_expired: false,
        }
    }

    pub fn allow_expired(mut self, allow: bool) -> Self {
        self.allow_expired = allow;
        self
    }
}

/// Claims carried by a verified identity token
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub exp: u64,
    /// The caller's own repository
    pub repository: ResourceId,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}

/// Verifies identity assertions against an issuer's published keys
pub struct IdentityVerifier {
    keys: KeyCache,
}

impl IdentityVerifier {
    /// Create a verifier whose key fetches time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self::with_key_cache(KeyCache::new(client))
    }

    pub fn with_key_cache(keys: KeyCache) -> Self {
        Self { keys }
    }

    /// Verify `assertion` and return its claims
    pub async fn verify(
        &self,
        assertion: &str,
        options: &VerifyOptions,
    ) -> Result<Claims, IdentityError> {
        let header = decode_header(assertion).map_err(IdentityError::Malformed)?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(IdentityError::UnsupportedAlgorithm(header.alg));
        }

        let kid = header.kid.ok_or(IdentityError::MissingKeyId)?;
        let key = self.keys.key_for(&options.issuer, &kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[options.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_aud = false;
        validation.validate_exp = !options.allow_expired;

        let data = decode::<Claims>(assertion, &key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_is_malformed() {
        let verifier = IdentityVerifier::with_client(reqwest::Client::new());
        let options = VerifyOptions::new("https://issuer.invalid");

        let err = verifier.verify("not-a-jwt", &options).await.unwrap_err();
        assert!(matches!(err, IdentityError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_symmetric_algorithm_rejected_before_key_lookup() {
        // {"alg":"HS256","typ":"JWT","kid":"k"} . {} . sig
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImsifQ.e30.c2ln";
        let verifier = IdentityVerifier::with_client(reqwest::Client::new());
        let options = VerifyOptions::new("https://issuer.invalid");

        let err = verifier.verify(token, &options).await.unwrap_err();
        assert!(matches!(err, IdentityError::UnsupportedAlgorithm(Algorithm::HS256)));
    }

    #[test]
    fn test_options_builder() {
        let options = VerifyOptions::new("https://issuer").allow_expired(true);
        assert!(options.allow_expired);
        assert_eq!(options.issuer, "https://issuer");
    }
}
