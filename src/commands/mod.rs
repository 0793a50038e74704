pub mod health;
pub mod score;
pub mod wallet;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult, GitHubErrorCode};
use crate::services::github_service::GitHubService;
use crate::services::score_cache::ScoreCache;
use crate::services::score_service::ScoreService;
use crate::utils::clock::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    score_service: Arc<ScoreService>,
    score_cache: Arc<ScoreCache>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let github = Arc::new(GitHubService::new(config.github.clone())?);
        let score_service = Arc::new(ScoreService::new(
            github,
            config.overrides.clone(),
            Arc::clone(&clock),
            config.analysis_timeout,
        ));
        let score_cache = Arc::new(ScoreCache::new(
            config.cache_capacity,
            config.cache_ttl,
            clock,
        ));

        Ok(Self::from_parts(score_service, score_cache))
    }

    pub fn from_parts(score_service: Arc<ScoreService>, score_cache: Arc<ScoreCache>) -> Self {
        Self {
            score_service,
            score_cache,
        }
    }

    pub fn scores(&self) -> Arc<ScoreService> {
        Arc::clone(&self.score_service)
    }

    pub fn cache(&self) -> Arc<ScoreCache> {
        Arc::clone(&self.score_cache)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// JSON error body returned by every endpoint: `{ "error": ..., "code": ... }`.
#[derive(Debug, Serialize)]
pub struct CommandError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: String,
    pub error: String,
}

impl CommandError {
    pub fn new(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            error: error.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation { message } => {
                CommandError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            AppError::GitHub { code, message, .. } => match code {
                GitHubErrorCode::NotFound => CommandError::not_found(message),
                GitHubErrorCode::RateLimited => {
                    CommandError::new(StatusCode::TOO_MANY_REQUESTS, code.as_str(), message)
                }
                _ => {
                    error!(target: "app::command", code = %code, %message, "GitHub failure in command");
                    CommandError::new(StatusCode::INTERNAL_SERVER_ERROR, code.as_str(), message)
                }
            },
            AppError::Config { message } => {
                CommandError::new(StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", message)
            }
            error @ AppError::Timeout { .. } => CommandError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TIMEOUT",
                error.to_string(),
            ),
            error @ AppError::External { .. } => {
                error!(target: "app::command", error = %error, "collaborator failure in command");
                CommandError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTERNAL_ERROR",
                    error.to_string(),
                )
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new(StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN", error.to_string())
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new(StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN", error.to_string())
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new(StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN", message)
            }
        }
    }
}
