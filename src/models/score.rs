use serde::{Deserialize, Serialize};

/// The eleven scored dimensions, in the order they are weighted and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    Repositories,
    Followers,
    Stars,
    Forks,
    AccountAge,
    Activity,
    Prs,
    Issues,
    Contributions,
    Profile,
    Languages,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 11] = [
        ScoreCategory::Repositories,
        ScoreCategory::Followers,
        ScoreCategory::Stars,
        ScoreCategory::Forks,
        ScoreCategory::AccountAge,
        ScoreCategory::Activity,
        ScoreCategory::Prs,
        ScoreCategory::Issues,
        ScoreCategory::Contributions,
        ScoreCategory::Profile,
        ScoreCategory::Languages,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreCategory::Repositories => "repositories",
            ScoreCategory::Followers => "followers",
            ScoreCategory::Stars => "stars",
            ScoreCategory::Forks => "forks",
            ScoreCategory::AccountAge => "accountAge",
            ScoreCategory::Activity => "activity",
            ScoreCategory::Prs => "prs",
            ScoreCategory::Issues => "issues",
            ScoreCategory::Contributions => "contributions",
            ScoreCategory::Profile => "profile",
            ScoreCategory::Languages => "languages",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            ScoreCategory::Repositories => 0.10,
            ScoreCategory::Followers => 0.10,
            ScoreCategory::Stars => 0.15,
            ScoreCategory::Forks => 0.05,
            ScoreCategory::AccountAge => 0.10,
            ScoreCategory::Activity => 0.15,
            ScoreCategory::Prs => 0.10,
            ScoreCategory::Issues => 0.05,
            ScoreCategory::Contributions => 0.10,
            ScoreCategory::Profile => 0.05,
            ScoreCategory::Languages => 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub repositories: f64,
    pub followers: f64,
    pub stars: f64,
    pub forks: f64,
    pub account_age: f64,
    pub activity: f64,
    pub prs: f64,
    pub issues: f64,
    pub contributions: f64,
    pub profile: f64,
    pub languages: f64,
}

impl ScoreBreakdown {
    /// Breakdown with every category set to the same value.
    pub fn uniform(value: f64) -> Self {
        let mut breakdown = Self::default();
        for category in ScoreCategory::ALL {
            *breakdown.get_mut(category) = value;
        }
        breakdown
    }

    pub fn get(&self, category: ScoreCategory) -> f64 {
        match category {
            ScoreCategory::Repositories => self.repositories,
            ScoreCategory::Followers => self.followers,
            ScoreCategory::Stars => self.stars,
            ScoreCategory::Forks => self.forks,
            ScoreCategory::AccountAge => self.account_age,
            ScoreCategory::Activity => self.activity,
            ScoreCategory::Prs => self.prs,
            ScoreCategory::Issues => self.issues,
            ScoreCategory::Contributions => self.contributions,
            ScoreCategory::Profile => self.profile,
            ScoreCategory::Languages => self.languages,
        }
    }

    pub fn get_mut(&mut self, category: ScoreCategory) -> &mut f64 {
        match category {
            ScoreCategory::Repositories => &mut self.repositories,
            ScoreCategory::Followers => &mut self.followers,
            ScoreCategory::Stars => &mut self.stars,
            ScoreCategory::Forks => &mut self.forks,
            ScoreCategory::AccountAge => &mut self.account_age,
            ScoreCategory::Activity => &mut self.activity,
            ScoreCategory::Prs => &mut self.prs,
            ScoreCategory::Issues => &mut self.issues,
            ScoreCategory::Contributions => &mut self.contributions,
            ScoreCategory::Profile => &mut self.profile,
            ScoreCategory::Languages => &mut self.languages,
        }
    }

    pub fn weighted_sum(&self) -> f64 {
        ScoreCategory::ALL
            .iter()
            .map(|category| self.get(*category) * category.weight())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDetails {
    pub public_repos: u64,
    pub followers: u64,
    pub total_stars: u64,
    pub total_forks: u64,
    pub account_age_years: f64,
    pub recent_commits: u64,
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    pub total_issues: u64,
    #[serde(rename = "contributedToPRs")]
    pub contributed_to_prs: u64,
    pub profile_completeness: u32,
    pub language_count: usize,
    pub avatar_url: Option<String>,
    pub github_url: Option<String>,
    pub name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub username: String,
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    pub details: ScoreDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_overridden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(default)]
    pub username: Option<serde_json::Value>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

impl ScoreRequest {
    /// Trimmed username when present as a non-blank string.
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_ref()
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
