use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use crate::error::{AppError, AppResult};
use crate::services::github_service::GitHubServiceConfig;
use crate::services::score_cache::{CacheTtl, ScoreCache};
use crate::services::score_overrides::ScoreOverrides;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_dir: Option<PathBuf>,
    pub github: GitHubServiceConfig,
    pub analysis_timeout: StdDuration,
    pub overrides: ScoreOverrides,
    pub cache_ttl: CacheTtl,
    pub cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: None,
            github: GitHubServiceConfig::default(),
            analysis_timeout: StdDuration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            overrides: ScoreOverrides::legacy(),
            cache_ttl: CacheTtl::Never,
            cache_capacity: 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        let raw_addr = std::env::var("REPUFI_BIND_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| AppError::config(format!("invalid REPUFI_BIND_ADDR '{raw_addr}': {err}")))?;

        let log_dir = std::env::var("REPUFI_LOG_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let analysis_timeout = std::env::var("REPUFI_ANALYSIS_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_SECS);

        Ok(Self {
            bind_addr,
            log_dir,
            github: GitHubServiceConfig::from_env(),
            analysis_timeout: StdDuration::from_secs(analysis_timeout),
            overrides: ScoreOverrides::from_env(),
            cache_ttl: CacheTtl::from_env(),
            cache_capacity: ScoreCache::capacity_from_env(),
        })
    }
}
