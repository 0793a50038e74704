pub mod github_service;
pub mod github_transport;
pub mod ipfs_service;
pub mod retry_policy;
pub mod score_cache;
pub mod score_overrides;
pub mod score_service;
pub mod vouch_service;
