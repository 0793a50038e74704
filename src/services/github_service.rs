use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, SecondsFormat};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, GitHubErrorCode};
use crate::models::github::{
    ActivityCounts, GitHubData, GitHubProfile, RepositorySummary, SearchCount,
};
use crate::services::github_transport::{HttpTransport, ReqwestTransport, TransportResponse};
use crate::services::retry_policy::{rate_limit_wait, RetryPolicy};
use crate::utils::clock::{Clock, SystemClock};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("repufi-drs/", env!("CARGO_PKG_VERSION"));
const COMMIT_SCAN_REPOS: usize = 5;
const COMMIT_WINDOW_DAYS: i64 = 30;
const USER_NOT_FOUND: &str = "GitHub user not found.";
const MISSING_TOKEN: &str = "GitHub API token is not configured on the server.";

#[derive(Debug, Clone)]
pub struct GitHubServiceConfig {
    pub token: Option<String>,
    pub base_url: String,
    pub retry: RetryPolicy,
    pub http_timeout: StdDuration,
}

impl Default for GitHubServiceConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            http_timeout: StdDuration::from_secs(30),
        }
    }
}

impl GitHubServiceConfig {
    pub fn from_env() -> Self {
        let token = std::env::var("REPUFI_GITHUB_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let base_url = std::env::var("REPUFI_GITHUB_BASE_URL")
            .ok()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_attempts = env_parse("REPUFI_GITHUB_MAX_ATTEMPTS").unwrap_or(3);
        let retry_delay_ms = env_parse("REPUFI_GITHUB_RETRY_DELAY_MS").unwrap_or(1000);
        let timeout_secs = env_parse("REPUFI_GITHUB_TIMEOUT_SECS").unwrap_or(30);

        Self {
            token,
            base_url,
            retry: RetryPolicy::new(max_attempts as usize, StdDuration::from_millis(retry_delay_ms)),
            http_timeout: StdDuration::from_secs(timeout_secs),
        }
    }
}

fn env_parse(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

#[derive(Clone)]
pub struct GitHubService {
    token: Option<String>,
    base_url: String,
    retry: RetryPolicy,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl GitHubService {
    pub fn new(config: GitHubServiceConfig) -> AppResult<Self> {
        let transport = Arc::new(ReqwestTransport::try_new(config.http_timeout)?);
        Ok(Self::with_transport(config, transport, Arc::new(SystemClock)))
    }

    pub fn with_transport(
        config: GitHubServiceConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token: config.token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            transport,
            clock,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Profile, owned repositories and activity counts for `username`.
    pub async fn fetch_github_data(&self, username: &str) -> AppResult<GitHubData> {
        let headers = self.request_headers()?;

        let user: GitHubProfile = self
            .fetch_json(&format!("{}/users/{username}", self.base_url), &headers)
            .await
            .map_err(|err| match err.github_code() {
                Some(GitHubErrorCode::NotFound) => {
                    AppError::github(GitHubErrorCode::NotFound, USER_NOT_FOUND)
                }
                _ => err,
            })?;

        let repos: Vec<RepositorySummary> = self
            .fetch_json(
                &format!(
                    "{}/users/{username}/repos?per_page=100&sort=updated&type=owner",
                    self.base_url
                ),
                &headers,
            )
            .await?;

        let recent_commits = self.count_recent_commits(username, &repos, &headers).await;

        let total_prs = self
            .search_count(&format!("author:{username}+type:pr"), &headers)
            .await?;
        let total_issues = self
            .search_count(&format!("author:{username}+type:issue"), &headers)
            .await?;
        let contributed_to_prs = self
            .search_count(&format!("author:{username}+type:pr+-user:{username}"), &headers)
            .await?;

        info!(
            target: "app::github",
            %username,
            repos = repos.len(),
            recent_commits,
            total_prs,
            total_issues,
            contributed_to_prs,
            "fetched GitHub activity"
        );

        Ok(GitHubData {
            user,
            repos,
            activity: ActivityCounts {
                recent_commits,
                total_prs,
                total_issues,
                contributed_to_prs,
            },
        })
    }

    /// GET with bounded retries; waits out rate-limit windows using the reset header.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> AppResult<TransportResponse> {
        let attempts = self.retry.max_attempts;

        for attempt in 0..attempts {
            let last_attempt = self.retry.is_last_attempt(attempt);

            let response = match self.transport.get(url, headers).await {
                Ok(response) => response,
                Err(error) => {
                    if !self.retry.should_retry(&error, attempt) {
                        return Err(error);
                    }
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        target: "app::github",
                        %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "request errored, retrying"
                    );
                    sleep(delay).await;
                    continue;
                }
            };

            if response.is_success() {
                return Ok(response);
            }

            if is_rate_limited(&response) {
                if last_attempt {
                    return Err(AppError::github_with_url(
                        GitHubErrorCode::RateLimited,
                        format!("Rate limit exceeded after {attempts} retries for {url}"),
                        Some(url),
                    ));
                }
                let wait = response
                    .header("x-ratelimit-reset")
                    .and_then(|value| value.trim().parse::<i64>().ok())
                    .map(|reset| rate_limit_wait(reset, self.clock.now()))
                    .unwrap_or_else(|| self.retry.delay_for(attempt));
                warn!(
                    target: "app::github",
                    %url,
                    wait_secs = wait.as_secs_f64(),
                    "rate limit hit, waiting for reset"
                );
                sleep(wait).await;
                continue;
            }

            if response.status == 404 {
                return Err(AppError::github_with_url(
                    GitHubErrorCode::NotFound,
                    format!("GitHub resource not found: {url}"),
                    Some(url),
                ));
            }

            if last_attempt {
                return Err(AppError::github_with_url(
                    GitHubErrorCode::GitHubUnavailable,
                    format!(
                        "Failed to fetch from {url} after {attempts} retries: {}",
                        response.status
                    ),
                    Some(url),
                ));
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                target: "app::github",
                %url,
                status = response.status,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "request failed, retrying"
            );
            sleep(delay).await;
        }

        Err(AppError::github_with_url(
            GitHubErrorCode::GitHubUnavailable,
            format!("Failed to fetch from {url} after {attempts} retries"),
            Some(url),
        ))
    }

    fn request_headers(&self) -> AppResult<Vec<(String, String)>> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| AppError::github(GitHubErrorCode::MissingToken, MISSING_TOKEN))?;

        Ok(vec![
            ("Authorization".to_string(), format!("token {token}")),
            ("Accept".to_string(), ACCEPT_HEADER.to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ])
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> AppResult<T> {
        let response = self.fetch_with_retry(url, headers).await?;
        serde_json::from_str(&response.body).map_err(|err| {
            AppError::github_with_url(
                GitHubErrorCode::InvalidResponse,
                format!("Unexpected response body from {url}: {err}"),
                Some(url),
            )
        })
    }

    async fn search_count(&self, query: &str, headers: &[(String, String)]) -> AppResult<u64> {
        let url = format!("{}/search/issues?q={query}&per_page=1", self.base_url);
        let result: SearchCount = self.fetch_json(&url, headers).await?;
        Ok(result.total_count)
    }

    /// Commits authored by `username` in the last 30 days across the most recently updated repos.
    /// Failures for a single repository only reduce the count.
    async fn count_recent_commits(
        &self,
        username: &str,
        repos: &[RepositorySummary],
        headers: &[(String, String)],
    ) -> u64 {
        let since = (self.clock.now() - Duration::days(COMMIT_WINDOW_DAYS))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut total = 0u64;

        for repo in repos.iter().take(COMMIT_SCAN_REPOS) {
            let Some(commits_url) = repo.commits_url.as_deref() else {
                continue;
            };
            let url = format!(
                "{}?author={username}&since={since}&per_page=100",
                commits_url.replace("{/sha}", "")
            );

            match self.fetch_json::<Vec<JsonValue>>(&url, headers).await {
                Ok(commits) => {
                    debug!(
                        target: "app::github",
                        repo = %repo.name,
                        commits = commits.len(),
                        "counted recent commits"
                    );
                    total += commits.len() as u64;
                }
                Err(error) => {
                    warn!(
                        target: "app::github",
                        repo = %repo.name,
                        error = %error,
                        "could not fetch commits, skipping repository"
                    );
                }
            }
        }

        total
    }
}

fn is_rate_limited(response: &TransportResponse) -> bool {
    matches!(response.status, 403 | 429)
        && response
            .header("x-ratelimit-remaining")
            .is_some_and(|value| value.trim() == "0")
}

pub mod testing {
    use super::*;

    /// Expose the rate-limit classification for integration tests.
    pub fn is_rate_limited_response(response: &TransportResponse) -> bool {
        is_rate_limited(response)
    }
}
