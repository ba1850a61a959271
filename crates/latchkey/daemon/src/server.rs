//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, GithubConfig};
use crate::error::{DaemonError, DaemonResult};
use axum::Router;
use latchkey_authority::{
    AppCredentials, AuthorityProvider, AuthorityResolver, GitHubAppProvider,
    InMemoryAuthorityProvider, TokenIssuer,
};
use latchkey_identity::{IdentityVerifier, VerifyOptions};
use latchkey_policy::{PolicyEvaluator, PolicyFetcher};
use latchkey_service::AccessBroker;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Latchkey daemon server
pub struct Server {
    config: DaemonConfig,
    broker: Arc<AccessBroker>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        config.validate()?;

        let provider = build_provider(&config)?;
        let verifier = IdentityVerifier::new(Duration::from_secs(config.identity.timeout_secs))
            .map_err(|e| DaemonError::Server(format!("Unable to build HTTP client: {}", e)))?;
        let options = VerifyOptions::new(config.identity.issuer.clone())
            .allow_expired(config.identity.allow_expired);

        let broker = AccessBroker::with_components(
            verifier,
            options,
            AuthorityResolver::new(provider.clone()),
            PolicyFetcher::with_path(provider.clone(), config.policy.path.clone()),
            PolicyEvaluator::new(),
            TokenIssuer::new(provider),
        );

        Ok(Self {
            config,
            broker: Arc::new(broker),
        })
    }

    /// Router serving the API
    pub fn router(&self) -> Router {
        create_router(AppState::new(self.broker.clone()), &self.config.server)
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        let listener = TcpListener::bind(addr).await?;

        tracing::info!(%addr, profile = ?self.config.profile, "Latchkey daemon listening");
        if self.config.identity.allow_expired {
            tracing::warn!("Expired identity tokens are accepted");
        }

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Latchkey daemon shutting down");
        Ok(())
    }
}

/// Build the downstream authority provider.
///
/// Without App credentials (development profile only, enforced by
/// validation) an empty in-memory provider is used, which denies every
/// exchange.
fn build_provider(config: &DaemonConfig) -> DaemonResult<Arc<dyn AuthorityProvider>> {
    let github = &config.github;
    let Some(app_id) = github.app_id.as_deref() else {
        tracing::warn!("No GitHub App configured, using empty in-memory authority");
        return Ok(Arc::new(InMemoryAuthorityProvider::new()));
    };

    let key = load_private_key(github)?;
    let credentials = AppCredentials::new(app_id, &key)
        .map_err(|e| DaemonError::Config(format!("Invalid GitHub App credentials: {}", e)))?;

    let provider = GitHubAppProvider::new(
        Arc::new(credentials),
        &github.api_url,
        Duration::from_secs(github.timeout_secs),
    )
    .map_err(|e| DaemonError::Server(format!("Unable to build GitHub client: {}", e)))?;

    tracing::info!(app_id, api_url = %github.api_url, "Using GitHub App authority");
    Ok(Arc::new(provider))
}

fn load_private_key(github: &GithubConfig) -> DaemonResult<SecretString> {
    if let Some(key) = &github.private_key {
        return Ok(SecretString::from(key.clone()));
    }

    match &github.private_key_path {
        Some(path) => std::fs::read_to_string(path)
            .map(SecretString::from)
            .map_err(|e| {
                DaemonError::Config(format!(
                    "Unable to read private key {}: {}",
                    path.display(),
                    e
                ))
            }),
        None => Err(DaemonError::Config(
            "github.private_key or github.private_key_path is required".to_string(),
        )),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
