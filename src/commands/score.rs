use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, warn};

use crate::commands::{AppState, CommandError, CommandResult};
use crate::error::AppError;
use crate::models::score::{ScoreRequest, ScoreResult};
use crate::services::score_service::USERNAME_REQUIRED;

/// `POST /score`: compute the reputation score for a GitHub login.
pub async fn score_github_user(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> CommandResult<Json<ScoreResult>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(target: "app::command", error = %rejection, "unreadable score request body");
        CommandError::from(AppError::validation(USERNAME_REQUIRED))
    })?;

    let username = request
        .username()
        .ok_or_else(|| AppError::validation(USERNAME_REQUIRED))?;

    let result = state.scores().analyze(username).await?;

    if let Some(address) = request
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        match state.cache().store(address, result.clone()) {
            Ok(_) => debug!(target: "app::command", %address, %username, "cached score for wallet"),
            Err(error) => {
                warn!(target: "app::command", %address, error = %error, "failed to cache score")
            }
        }
    }

    Ok(Json(result))
}

/// `OPTIONS /score`: CORS preflight.
pub async fn score_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
