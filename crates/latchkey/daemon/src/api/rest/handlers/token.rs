//! Token exchange handler

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::SecondsFormat;
use latchkey_types::{IssuedToken, PermissionSet};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange request
#[derive(Deserialize)]
pub struct TokenRequest {
    /// Identity token issued to the calling workload
    pub id_token: String,
    /// `self` or `owner/name`
    pub repo: String,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("id_token", &"[REDACTED]")
            .field("repo", &self.repo)
            .finish()
    }
}

/// Exchange response
#[derive(Serialize)]
pub struct TokenResponse {
    pub repo: String,
    /// RFC 3339
    pub expires_at: String,
    pub permissions: PermissionSet,
    pub token: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("repo", &self.repo)
            .field("expires_at", &self.expires_at)
            .field("permissions", &self.permissions)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            repo: issued.repo.to_string(),
            expires_at: issued.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            permissions: issued.permissions,
            token: issued.token.expose_secret().to_string(),
        }
    }
}

/// Exchange an identity token for a repository token
pub async fn exchange_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(request) = body?;

    let issued = state
        .broker
        .exchange(&request.id_token, &request.repo)
        .await?;

    Ok(Json(TokenResponse::from(issued)))
}
