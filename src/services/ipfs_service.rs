use std::time::Duration as StdDuration;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Content-addressed JSON retrieval (vouch metadata documents).
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn fetch_json(&self, cid: &str) -> AppResult<JsonValue>;
}

pub struct IpfsGateway {
    client: reqwest::Client,
    gateway_url: String,
}

impl IpfsGateway {
    pub fn try_new(gateway_url: impl Into<String>, timeout: StdDuration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::other(format!("failed to build IPFS HTTP client: {err}")))?;

        Ok(Self {
            client,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl MetadataStore for IpfsGateway {
    async fn fetch_json(&self, cid: &str) -> AppResult<JsonValue> {
        let cid = cid.trim();
        if cid.is_empty() {
            return Err(AppError::validation("metadata CID is empty"));
        }

        let url = format!("{}/{cid}", self.gateway_url);
        debug!(target: "app::ipfs", %url, "fetching metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| AppError::external("ipfs", format!("request for {cid} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external(
                "ipfs",
                format!(
                    "Failed to fetch from IPFS gateway ({}): {cid}",
                    status.as_u16()
                ),
            ));
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(|err| AppError::external("ipfs", format!("invalid JSON for {cid}: {err}")))
    }
}
