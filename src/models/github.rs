use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user profile as returned by `GET /users/{login}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl GitHubProfile {
    /// Number of filled-in optional profile fields (name, bio, location, company, blog).
    pub fn filled_profile_fields(&self) -> usize {
        [
            &self.name,
            &self.bio,
            &self.location,
            &self.company,
            &self.blog,
        ]
        .iter()
        .filter(|field| field.as_deref().is_some_and(|value| !value.is_empty()))
        .count()
    }
}

/// One entry of `GET /users/{login}/repos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub commits_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub recent_commits: u64,
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    pub total_issues: u64,
    #[serde(rename = "contributedToPRs")]
    pub contributed_to_prs: u64,
}

/// Everything the score calculator consumes for one user.
#[derive(Debug, Clone)]
pub struct GitHubData {
    pub user: GitHubProfile,
    pub repos: Vec<RepositorySummary>,
    pub activity: ActivityCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchCount {
    #[serde(default)]
    pub total_count: u64,
}
