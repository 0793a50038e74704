use std::collections::HashMap;
use std::time::{Duration as StdDuration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{AppError, AppResult, GitHubErrorCode};
use crate::utils::redact::redact_sensitive_data;

/// Status, lower-cased headers and raw body of one HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam between the fetcher's retry loop and the network.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> AppResult<TransportResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn try_new(timeout: StdDuration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build GitHub HTTP client: {err}")))?;

        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> AppResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| AppError::other(format!("invalid header name {name}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| AppError::other(format!("invalid header value: {err}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn error_from_reqwest(err: reqwest::Error, url: &str) -> AppError {
        if err.is_timeout() {
            AppError::github_with_url(
                GitHubErrorCode::HttpTimeout,
                format!("Request to {url} timed out"),
                Some(url),
            )
        } else if err.is_connect() {
            AppError::github_with_url(
                GitHubErrorCode::GitHubUnavailable,
                format!("Could not connect to {url}"),
                Some(url),
            )
        } else {
            AppError::github_with_url(
                GitHubErrorCode::Unknown,
                format!("Request to {url} failed: {err}"),
                Some(url),
            )
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> AppResult<TransportResponse> {
        let logged_headers: JsonValue = headers
            .iter()
            .map(|(name, value)| (name.clone(), json!(value)))
            .collect::<serde_json::Map<_, _>>()
            .into();
        debug!(
            target: "app::github::http",
            %url,
            headers = %redact_sensitive_data(&logged_headers),
            "GET"
        );

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .headers(Self::header_map(headers)?)
            .send()
            .await
            .map_err(|err| Self::error_from_reqwest(err, url))?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|text| (name.as_str().to_ascii_lowercase(), text.to_string()))
            })
            .collect::<HashMap<_, _>>();
        let body = response
            .text()
            .await
            .map_err(|err| Self::error_from_reqwest(err, url))?;

        debug!(
            target: "app::github::http",
            %url,
            status,
            latency_ms = start.elapsed().as_millis() as u64,
            body_len = body.len(),
            "GitHub responded"
        );

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
