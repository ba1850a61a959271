//! Liveness endpoint

use crate::api::rest::state::{format_uptime, AppState};
use axum::{extract::State, Json};
use serde::Serialize;

/// Liveness report. Carries nothing secret: the issuer is public.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: String,
    /// Identity issuer this daemon trusts
    pub issuer: String,
    pub uptime: String,
    pub uptime_secs: i64,
}

impl Health {
    fn of(state: &AppState) -> Self {
        let uptime_secs = state.uptime_secs();
        Self {
            status: "ok",
            version: state.version.clone(),
            issuer: state.broker.verify_options().issuer.clone(),
            uptime: format_uptime(uptime_secs),
            uptime_secs,
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Health> {
    Json(Health::of(&state))
}
