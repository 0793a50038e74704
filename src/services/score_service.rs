use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::github::{ActivityCounts, GitHubProfile, RepositorySummary};
use crate::models::score::{ScoreBreakdown, ScoreCategory, ScoreDetails, ScoreResult};
use crate::services::github_service::GitHubService;
use crate::services::score_overrides::ScoreOverrides;
use crate::utils::clock::Clock;

const MS_PER_YEAR: f64 = 1000.0 * 60.0 * 60.0 * 24.0 * 365.0;
const CATEGORY_FLOOR: f64 = 5.0;
const CATEGORY_CEILING: f64 = 10.0;
const FINAL_BUMP: f64 = 0.1;

pub const USERNAME_REQUIRED: &str = "Username is required.";

/// Fetch, score and override pipeline behind `POST /score`.
pub struct ScoreService {
    github: Arc<GitHubService>,
    overrides: ScoreOverrides,
    clock: Arc<dyn Clock>,
    analysis_timeout: StdDuration,
}

impl ScoreService {
    pub fn new(
        github: Arc<GitHubService>,
        overrides: ScoreOverrides,
        clock: Arc<dyn Clock>,
        analysis_timeout: StdDuration,
    ) -> Self {
        Self {
            github,
            overrides,
            clock,
            analysis_timeout,
        }
    }

    pub fn overrides(&self) -> &ScoreOverrides {
        &self.overrides
    }

    pub fn has_github_token(&self) -> bool {
        self.github.has_token()
    }

    pub async fn analyze(&self, username: &str) -> AppResult<ScoreResult> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation(USERNAME_REQUIRED));
        }

        debug!(target: "app::score", %username, "analyzing GitHub user");

        let data = timeout(self.analysis_timeout, self.github.fetch_github_data(username))
            .await
            .map_err(|_| {
                AppError::timeout(
                    format!("GitHub analysis for {username}"),
                    self.analysis_timeout.as_secs(),
                )
            })??;

        let mut result = calculate_score(&data.user, &data.repos, &data.activity, self.clock.now());
        self.overrides.apply(username, &mut result);

        info!(
            target: "app::score",
            %username,
            total_score = result.total_score,
            overridden = result.is_overridden.unwrap_or(false),
            "score computed"
        );

        Ok(result)
    }
}

/// Rounds to one decimal on the exact binary value, ties away from zero.
/// `5.35` is stored as `5.3499..` and rounds down.
pub fn round_one_decimal(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }

    // Only the first two fractional digits of the exact expansion matter.
    let exact = format!("{:.60}", value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut digits = fraction.bytes();
    let tenths = digits.next().map_or(0, |digit| u64::from(digit - b'0'));
    let round_up = digits.next().is_some_and(|digit| digit >= b'5');

    let Ok(whole) = whole.parse::<u64>() else {
        return value;
    };
    let scaled = whole * 10 + tenths + u64::from(round_up);
    (scaled as f64 / 10.0).copysign(value)
}

fn category_score(raw: f64) -> f64 {
    round_one_decimal(raw.clamp(CATEGORY_FLOOR, CATEGORY_CEILING))
}

fn linear(metric: f64, full_marks_at: f64) -> f64 {
    (CATEGORY_FLOOR + metric / full_marks_at * 5.0).min(CATEGORY_CEILING)
}

fn logarithmic(metric: f64, weight: f64) -> f64 {
    (CATEGORY_FLOOR + (metric + 1.0).max(1.0).log10() * weight).min(CATEGORY_CEILING)
}

/// Developer Reputation Score for one user. Pure apart from the injected `now`.
pub fn calculate_score(
    user: &GitHubProfile,
    repos: &[RepositorySummary],
    activity: &ActivityCounts,
    now: DateTime<Utc>,
) -> ScoreResult {
    let total_stars: u64 = repos.iter().map(|repo| repo.stargazers_count).sum();
    let total_forks: u64 = repos.iter().map(|repo| repo.forks_count).sum();
    let account_age = (now - user.created_at).num_milliseconds() as f64 / MS_PER_YEAR;
    let language_count = repos
        .iter()
        .filter_map(|repo| repo.language.as_deref())
        .filter(|language| !language.is_empty())
        .collect::<HashSet<_>>()
        .len();
    let profile_completeness = user.filled_profile_fields() as f64 / 5.0 * 100.0;

    let mut breakdown = ScoreBreakdown::default();
    for category in ScoreCategory::ALL {
        let raw = match category {
            ScoreCategory::Repositories => linear(user.public_repos as f64, 25.0),
            ScoreCategory::Followers => logarithmic(user.followers as f64, 1.5),
            ScoreCategory::Stars => logarithmic(total_stars as f64, 1.2),
            ScoreCategory::Forks => logarithmic(total_forks as f64, 1.0),
            ScoreCategory::AccountAge => {
                (CATEGORY_FLOOR + (account_age * 1.25).min(5.0)).min(CATEGORY_CEILING)
            }
            ScoreCategory::Activity => linear(activity.recent_commits as f64, 25.0),
            ScoreCategory::Prs => logarithmic(activity.total_prs as f64, 1.5),
            ScoreCategory::Issues => logarithmic(activity.total_issues as f64, 1.0),
            ScoreCategory::Contributions => logarithmic(activity.contributed_to_prs as f64, 2.0),
            ScoreCategory::Profile => CATEGORY_FLOOR + profile_completeness / 100.0 * 5.0,
            ScoreCategory::Languages => linear(language_count as f64, 4.0),
        };
        *breakdown.get_mut(category) = category_score(raw);
    }

    // The bump lands after the clamp, so the ceiling is 10.1.
    let total_score = round_one_decimal(
        breakdown
            .weighted_sum()
            .clamp(CATEGORY_FLOOR, CATEGORY_CEILING)
            + FINAL_BUMP,
    );

    ScoreResult {
        username: user.login.clone(),
        total_score,
        breakdown,
        details: ScoreDetails {
            public_repos: user.public_repos,
            followers: user.followers,
            total_stars,
            total_forks,
            account_age_years: round_one_decimal(account_age),
            recent_commits: activity.recent_commits,
            total_prs: activity.total_prs,
            total_issues: activity.total_issues,
            contributed_to_prs: activity.contributed_to_prs,
            profile_completeness: profile_completeness.round() as u32,
            language_count,
            avatar_url: user.avatar_url.clone(),
            github_url: user.html_url.clone(),
            name: user
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| user.login.clone()),
            bio: user.bio.clone(),
        },
        is_overridden: None,
        override_note: None,
    }
}
