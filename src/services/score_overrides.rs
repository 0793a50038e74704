use std::collections::HashMap;

use tracing::{info, warn};

use crate::models::score::{ScoreBreakdown, ScoreResult};
use crate::services::score_service::round_one_decimal;

const LEGACY_OVERRIDES: [(&str, f64); 2] = [("rohandroid-7341", 10.0), ("bansal-ishaan", 6.0)];

/// Fixed scores for specific GitHub identities, keyed by lower-cased login.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreOverrides {
    entries: HashMap<String, f64>,
}

impl ScoreOverrides {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(login, score)| (normalize(login.as_ref()), score))
                .filter(|(login, _)| !login.is_empty())
                .collect(),
        }
    }

    pub fn legacy() -> Self {
        Self::new(LEGACY_OVERRIDES)
    }

    /// `REPUFI_SCORE_OVERRIDES=login=score,login=score`; unset keeps the legacy table, empty disables.
    pub fn from_env() -> Self {
        match std::env::var("REPUFI_SCORE_OVERRIDES") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Self::legacy(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let entries = raw.split(',').filter_map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }
            let Some((login, score)) = item.split_once('=') else {
                warn!(target: "app::score", entry = %item, "ignoring malformed score override");
                return None;
            };
            match score.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Some((login.trim().to_string(), value)),
                _ => {
                    warn!(target: "app::score", entry = %item, "ignoring score override with invalid score");
                    None
                }
            }
        });
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, username: &str) -> Option<f64> {
        self.entries.get(&normalize(username)).copied()
    }

    /// Replace the computed score when `username` has an override. Details are left untouched.
    pub fn apply(&self, username: &str, result: &mut ScoreResult) -> bool {
        let Some(score) = self.lookup(username) else {
            return false;
        };

        info!(target: "app::score", %username, score, "applying score override");
        result.total_score = score;
        result.breakdown = synthetic_breakdown(score);
        result.is_overridden = Some(true);
        result.override_note = Some(format!(
            "Score manually set to {score}. Original calculated data is still present in 'details'."
        ));
        true
    }
}

/// Breakdown whose categories all sit at the override score, kept inside the category range.
pub fn synthetic_breakdown(score: f64) -> ScoreBreakdown {
    ScoreBreakdown::uniform(round_one_decimal(score.clamp(5.0, 10.0)))
}

fn normalize(login: &str) -> String {
    login.trim().to_lowercase()
}
