use std::fmt;

use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorCode {
    MissingToken,
    NotFound,
    RateLimited,
    HttpTimeout,
    GitHubUnavailable,
    InvalidResponse,
    Unknown,
}

impl GitHubErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            GitHubErrorCode::MissingToken => "MISSING_TOKEN",
            GitHubErrorCode::NotFound => "NOT_FOUND",
            GitHubErrorCode::RateLimited => "RATE_LIMITED",
            GitHubErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            GitHubErrorCode::GitHubUnavailable => "GITHUB_UNAVAILABLE",
            GitHubErrorCode::InvalidResponse => "INVALID_RESPONSE",
            GitHubErrorCode::Unknown => "UNKNOWN_GITHUB_ERROR",
        }
    }

    /// Transient failures worth another attempt under the retry policy.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            GitHubErrorCode::HttpTimeout
                | GitHubErrorCode::GitHubUnavailable
                | GitHubErrorCode::Unknown
        )
    }
}

impl fmt::Display for GitHubErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Config { message: String },

    #[error("{message}")]
    GitHub {
        code: GitHubErrorCode,
        message: String,
        url: Option<String>,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("{service} error: {message}")]
    External {
        service: &'static str,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::config", %message, "configuration error");
        AppError::Config { message }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation { message }
    }

    pub fn github(code: GitHubErrorCode, message: impl Into<String>) -> Self {
        Self::github_with_url(code, message, None)
    }

    pub fn github_with_url(
        code: GitHubErrorCode,
        message: impl Into<String>,
        url: Option<&str>,
    ) -> Self {
        let message = message.into();
        let url = url.map(|value| value.to_string());
        match &url {
            Some(target_url) => {
                warn!(target: "app::github::error", code = %code, url = %target_url, %message);
            }
            None => {
                warn!(target: "app::github::error", code = %code, %message);
            }
        }

        AppError::GitHub { code, message, url }
    }

    pub fn github_code(&self) -> Option<GitHubErrorCode> {
        match self {
            AppError::GitHub { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn github_url(&self) -> Option<&str> {
        match self {
            AppError::GitHub { url, .. } => url.as_deref(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.github_code()
            .map(GitHubErrorCode::is_transient)
            .unwrap_or(false)
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        let operation = operation.into();
        warn!(target: "app::timeout", %operation, seconds, "operation timed out");
        AppError::Timeout { operation, seconds }
    }

    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::external", service, %message, "external collaborator error");
        AppError::External { service, message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}
