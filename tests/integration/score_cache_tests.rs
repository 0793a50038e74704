use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use repufi_drs_lib::models::score::{ScoreBreakdown, ScoreDetails, ScoreResult};
use repufi_drs_lib::services::score_cache::{CacheTtl, CachedScore, ScoreCache};
use repufi_drs_lib::utils::clock::{Clock, ManualClock};

const WALLET: &str = "0xAbC0000000000000000000000000000000000001";

fn result(username: &str, total_score: f64) -> ScoreResult {
    ScoreResult {
        username: username.to_string(),
        total_score,
        breakdown: ScoreBreakdown::uniform(5.0),
        details: ScoreDetails {
            public_repos: 0,
            followers: 0,
            total_stars: 0,
            total_forks: 0,
            account_age_years: 0.0,
            recent_commits: 0,
            total_prs: 0,
            total_issues: 0,
            contributed_to_prs: 0,
            profile_completeness: 0,
            language_count: 0,
            avatar_url: None,
            github_url: None,
            name: username.to_string(),
            bio: None,
        },
        is_overridden: None,
        override_note: None,
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ))
}

#[test]
fn entries_never_expire_by_default() {
    let clock = clock();
    let cache = ScoreCache::new(8, CacheTtl::default(), clock.clone());

    let stored = cache.store(WALLET, result("octocat", 7.7)).unwrap().unwrap();
    assert_eq!(stored.timestamp, clock.now().timestamp_millis());

    clock.advance(Duration::days(3650));

    let cached = cache.get(WALLET).unwrap().expect("still cached");
    assert_eq!(cached.result.total_score, 7.7);
    assert_eq!(cache.purge_expired().unwrap(), 0);
}

#[test]
fn addresses_are_trimmed_and_case_insensitive() {
    let cache = ScoreCache::new(8, CacheTtl::Never, clock());

    cache.store(&format!("  {WALLET} "), result("octocat", 6.3)).unwrap();

    assert!(cache.get(&WALLET.to_lowercase()).unwrap().is_some());
    assert!(cache.get(&WALLET.to_uppercase().replace("0X", "0x")).unwrap().is_some());
    assert_eq!(cache.len().unwrap(), 1);
}

#[test]
fn blank_addresses_are_ignored() {
    let cache = ScoreCache::new(8, CacheTtl::Never, clock());

    assert!(cache.store("   ", result("octocat", 6.3)).unwrap().is_none());
    assert!(cache.get("").unwrap().is_none());
    assert!(!cache.clear(" ").unwrap());
    assert!(cache.is_empty().unwrap());
}

#[test]
fn newer_score_replaces_older_one() {
    let clock = clock();
    let cache = ScoreCache::new(8, CacheTtl::Never, clock.clone());

    cache.store(WALLET, result("octocat", 6.0)).unwrap();
    clock.advance(Duration::minutes(5));
    cache.store(WALLET, result("octocat", 8.2)).unwrap();

    let cached = cache.get(WALLET).unwrap().unwrap();
    assert_eq!(cached.result.total_score, 8.2);
    assert_eq!(cached.stored_at(), clock.now());
}

#[test]
fn ttl_drops_stale_entries_on_read() {
    let clock = clock();
    let cache = ScoreCache::new(8, CacheTtl::After(Duration::hours(1)), clock.clone());

    cache.store(WALLET, result("octocat", 7.1)).unwrap();

    clock.advance(Duration::minutes(59));
    assert!(cache.get(WALLET).unwrap().is_some());

    clock.advance(Duration::minutes(1));
    assert!(cache.get(WALLET).unwrap().is_none());
    assert!(cache.is_empty().unwrap());
}

#[test]
fn purge_removes_only_stale_entries() {
    let clock = clock();
    let cache = ScoreCache::new(8, CacheTtl::After(Duration::hours(1)), clock.clone());

    cache.store("0x01", result("old", 6.0)).unwrap();
    clock.advance(Duration::minutes(45));
    cache.store("0x02", result("fresh", 7.0)).unwrap();
    clock.advance(Duration::minutes(30));

    assert_eq!(cache.purge_expired().unwrap(), 1);
    assert!(cache.get("0x01").unwrap().is_none());
    assert_eq!(cache.get("0x02").unwrap().unwrap().result.username, "fresh");
}

#[test]
fn clear_reports_whether_an_entry_existed() {
    let cache = ScoreCache::new(8, CacheTtl::Never, clock());
    cache.store(WALLET, result("octocat", 7.0)).unwrap();

    assert!(cache.clear(&WALLET.to_lowercase()).unwrap());
    assert!(!cache.clear(WALLET).unwrap());
    assert!(cache.get(WALLET).unwrap().is_none());
}

#[test]
fn least_recently_used_wallet_is_evicted_at_capacity() {
    let cache = ScoreCache::new(2, CacheTtl::Never, clock());

    cache.store("0x01", result("one", 6.0)).unwrap();
    cache.store("0x02", result("two", 6.5)).unwrap();
    cache.get("0x01").unwrap();
    cache.store("0x03", result("three", 7.0)).unwrap();

    assert!(cache.get("0x01").unwrap().is_some());
    assert!(cache.get("0x02").unwrap().is_none());
    assert!(cache.get("0x03").unwrap().is_some());
}

#[test]
fn cached_score_serializes_flat_with_timestamp() {
    let entry = CachedScore {
        result: result("octocat", 7.7),
        timestamp: 1_748_779_200_000,
    };

    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["username"], "octocat");
    assert_eq!(value["totalScore"], 7.7);
    assert_eq!(value["timestamp"], 1_748_779_200_000_i64);
    assert!(value.get("result").is_none());

    let back: CachedScore = serde_json::from_value(value).unwrap();
    assert_eq!(back, entry);
}
