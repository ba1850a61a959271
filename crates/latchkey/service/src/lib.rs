//! Latchkey Service - the identity-for-token exchange pipeline
//!
//! [`AccessBroker`] runs one exchange end to end:
//!
//! 1. verify the caller's identity token
//! 2. resolve the broker's authority over the target repository
//! 3. fetch the target's access policy
//! 4. evaluate it for the caller and narrow against the authority
//! 5. mint a token scoped to exactly the narrowed permissions
//!
//! Each stage either feeds the next or ends the exchange with a
//! [`BrokerError`]. The broker is the only place failures are classified.

#![deny(unsafe_code)]

mod error;
mod stage;

pub use error::{BrokerError, Classification, NO_PERMISSION_GRANTED};
pub use stage::{Stage, StageTracker};

use latchkey_authority::{AuthorityProvider, AuthorityResolver, TokenIssuer};
use latchkey_identity::{IdentityVerifier, VerifyOptions};
use latchkey_policy::{PolicyEvaluator, PolicyFetcher};
use latchkey_types::{IssuedToken, RepoSelector};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Exchanges verified workload identities for scoped repository tokens
pub struct AccessBroker {
    verifier: IdentityVerifier,
    options: VerifyOptions,
    resolver: AuthorityResolver,
    fetcher: PolicyFetcher,
    evaluator: PolicyEvaluator,
    issuer: TokenIssuer,
}

impl AccessBroker {
    /// Create a broker whose downstream stages all talk to `provider`
    pub fn new(
        provider: Arc<dyn AuthorityProvider>,
        verifier: IdentityVerifier,
        options: VerifyOptions,
    ) -> Self {
        Self {
            verifier,
            options,
            resolver: AuthorityResolver::new(provider.clone()),
            fetcher: PolicyFetcher::new(provider.clone()),
            evaluator: PolicyEvaluator::new(),
            issuer: TokenIssuer::new(provider),
        }
    }

    /// Create with custom components
    pub fn with_components(
        verifier: IdentityVerifier,
        options: VerifyOptions,
        resolver: AuthorityResolver,
        fetcher: PolicyFetcher,
        evaluator: PolicyEvaluator,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            verifier,
            options,
            resolver,
            fetcher,
            evaluator,
            issuer,
        }
    }

    pub fn verify_options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Exchange `id_token` for a token on `repo` (`self` or `owner/name`)
    pub async fn exchange(&self, id_token: &str, repo: &str) -> Result<IssuedToken, BrokerError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("exchange", %request_id);

        async {
            let mut stages = StageTracker::new();
            match self.run(id_token, repo, &mut stages).await {
                Ok(issued) => {
                    let stage = stages.advance();
                    debug!(%stage, "Exchange complete");
                    Ok(issued)
                }
                Err(err) => {
                    let reached = stages.fail();
                    debug_assert_eq!(reached, err.reached());
                    info!(
                        stage = %stages.current(),
                        %reached,
                        error = %err,
                        "Exchange rejected"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        id_token: &str,
        repo: &str,
        stages: &mut StageTracker,
    ) -> Result<IssuedToken, BrokerError> {
        let selector = RepoSelector::parse(repo)?;
        debug!(stage = %stages.current(), "Exchange requested");

        let claims = self.verifier.verify(id_token, &self.options).await?;
        let source = claims.repository;
        let target = selector.resolve(&source);
        let stage = stages.advance();
        debug!(%stage, %source, %target);

        let authority = self.resolver.resolve(&target).await?;
        let stage = stages.advance();
        debug!(%stage, installation_id = authority.installation_id);

        let policy = self.fetcher.fetch(&target, &authority).await;
        let evaluation = self
            .evaluator
            .evaluate(policy.as_ref(), &source, &target, &authority);
        let outcome = evaluation.outcome();
        let permissions = evaluation.into_permissions();
        let stage = stages.advance();
        info!(%stage, %source, %target, outcome, %permissions);

        if permissions.is_empty() {
            return Err(BrokerError::NotGranted { outcome });
        }

        let issued = self.issuer.issue(&target, &authority, &permissions).await?;
        let stage = stages.advance();
        debug!(%stage, expires_at = %issued.expires_at);
        Ok(issued)
    }
}
