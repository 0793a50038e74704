use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::commands::{AppState, CommandError, CommandResult};
use crate::services::score_cache::CachedScore;

const NO_CACHED_SCORE: &str = "No cached score for this wallet.";

pub async fn wallet_score_fetch(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> CommandResult<Json<CachedScore>> {
    state
        .cache()
        .get(&address)?
        .map(Json)
        .ok_or_else(|| CommandError::not_found(NO_CACHED_SCORE))
}

pub async fn wallet_score_clear(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> CommandResult<StatusCode> {
    if state.cache().clear(&address)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CommandError::not_found(NO_CACHED_SCORE))
    }
}
