//! GitHub App backed authority provider

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use latchkey_types::{Authority, PermissionSet, ResourceId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{AuthorityProvider, MintedToken};

/// Public GitHub REST API
pub const GITHUB_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("latchkey/", env!("CARGO_PKG_VERSION"));

/// GitHub caps app tokens at ten minutes; stay under it and backdate
/// `iat` to absorb clock drift.
const APP_JWT_TTL_SECS: i64 = 540;
const APP_JWT_BACKDATE_SECS: i64 = 60;

/// The broker's standing GitHub App credential.
///
/// Loaded once at startup and passed explicitly to the provider. The
/// private key is parsed up front and never printed.
pub struct AppCredentials {
    app_id: String,
    key: EncodingKey,
}

impl AppCredentials {
    pub fn new(app_id: impl Into<String>, private_key: &SecretString) -> Result<Self, ProviderError> {
        let app_id = app_id.into();
        if app_id.trim().is_empty() {
            return Err(ProviderError::Credentials("app id is empty".to_string()));
        }

        let key = EncodingKey::from_rsa_pem(private_key.expose_secret().as_bytes())
            .map_err(|e| ProviderError::Credentials(format!("private key: {}", e)))?;

        Ok(Self { app_id, key })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Sign a short-lived app JWT for `now` (unix seconds)
    fn app_jwt(&self, now: i64) -> Result<SecretString, ProviderError> {
        #[derive(Serialize)]
        struct AppClaims<'a> {
            iat: i64,
            exp: i64,
            iss: &'a str,
        }

        let claims = AppClaims {
            iat: now - APP_JWT_BACKDATE_SECS,
            exp: now + APP_JWT_TTL_SECS,
            iss: &self.app_id,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map(SecretString::from)
            .map_err(|e| ProviderError::Jwt(e.to_string()))
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Talks to the GitHub REST API as a GitHub App
pub struct GitHubAppProvider {
    client: Client,
    api_url: String,
    credentials: Arc<AppCredentials>,
}

#[derive(Deserialize)]
struct InstallationResponse {
    id: u64,
    #[serde(default)]
    permissions: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    repositories: [&'a str; 1],
    permissions: &'a PermissionSet,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    permissions: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubAppProvider {
    /// Create a provider whose API calls time out after `timeout`
    pub fn new(
        credentials: Arc<AppCredentials>,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, credentials, api_url))
    }

    pub fn with_client(client: Client, credentials: Arc<AppCredentials>, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn as_app(&self, request: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        let jwt = self.credentials.app_jwt(Utc::now().timestamp())?;
        Ok(with_api_headers(request).bearer_auth(jwt.expose_secret()))
    }

    async fn failure(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read response body".to_string());
        ProviderError::Status { status, message }
    }
}

fn with_api_headers(request: RequestBuilder) -> RequestBuilder {
    request
        .header("Accept", ACCEPT)
        .header("X-GitHub-Api-Version", API_VERSION)
        .header("User-Agent", USER_AGENT)
}

/// Decode base64 file content as returned by the contents API, which wraps
/// lines every 60 characters.
fn decode_content(content: &str) -> Result<Vec<u8>, ProviderError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ProviderError::InvalidResponse(format!("file content: {}", e)))
}

#[async_trait]
impl AuthorityProvider for GitHubAppProvider {
    async fn installation(&self, repo: &ResourceId) -> Result<Option<Authority>, ProviderError> {
        let url = self.url(&format!("/repos/{}/{}/installation", repo.owner(), repo.name()));
        let response = self.as_app(self.client.get(url))?.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(%repo, "No installation for repository");
                Ok(None)
            }
            status if status.is_success() => {
                let body: InstallationResponse = response.json().await?;
                Ok(Some(Authority::new(
                    body.id,
                    PermissionSet::from_raw(body.permissions),
                )))
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn mint_token(
        &self,
        installation_id: u64,
        repo: &ResourceId,
        permissions: &PermissionSet,
    ) -> Result<MintedToken, ProviderError> {
        let url = self.url(&format!("/app/installations/{}/access_tokens", installation_id));
        let body = AccessTokenRequest {
            repositories: [repo.name()],
            permissions,
        };

        let response = self
            .as_app(self.client.post(url))?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let minted: AccessTokenResponse = response.json().await?;
        Ok(MintedToken {
            token: SecretString::from(minted.token),
            expires_at: minted.expires_at,
            permissions: minted
                .permissions
                .map(PermissionSet::from_raw)
                .unwrap_or_else(|| permissions.clone()),
        })
    }

    async fn read_file(
        &self,
        repo: &ResourceId,
        path: &str,
        token: &SecretString,
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{}",
            repo.owner(),
            repo.name(),
            path.trim_start_matches('/')
        ));

        let response = with_api_headers(self.client.get(url))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let body: ContentResponse = response.json().await.map_err(|e| {
                    ProviderError::InvalidResponse(format!("{} is not a file: {}", path, e))
                })?;
                match (body.content, body.encoding.as_deref()) {
                    (Some(content), Some("base64")) => decode_content(&content).map(Some),
                    (Some(content), None) => Ok(Some(content.into_bytes())),
                    (_, encoding) => Err(ProviderError::InvalidResponse(format!(
                        "unsupported content encoding {:?}",
                        encoding
                    ))),
                }
            }
            _ => Err(Self::failure(response).await),
        }
    }
}
