use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::commands::{AppState, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub github_token_configured: bool,
    pub score_overrides: usize,
    pub cached_scores: usize,
}

pub async fn healthz(State(state): State<AppState>) -> CommandResult<Json<HealthStatus>> {
    let scores = state.scores();
    Ok(Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        github_token_configured: scores.has_github_token(),
        score_overrides: scores.overrides().len(),
        cached_scores: state.cache().len()?,
    }))
}
