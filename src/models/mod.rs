pub mod github;
pub mod score;
pub mod vouch;
