use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::score::ScoreResult;
use crate::utils::clock::Clock;

const DEFAULT_CAPACITY: usize = 1024;

/// How long a cached score stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheTtl {
    /// Entries are kept until cleared or evicted.
    #[default]
    Never,
    After(Duration),
}

impl CacheTtl {
    pub fn from_env() -> Self {
        std::env::var("REPUFI_SCORE_CACHE_TTL_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .map(|secs| CacheTtl::After(Duration::seconds(secs)))
            .unwrap_or_default()
    }

    fn is_stale(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            CacheTtl::Never => false,
            CacheTtl::After(ttl) => now - stored_at >= *ttl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScore {
    #[serde(flatten)]
    pub result: ScoreResult,
    /// Unix milliseconds at store time.
    pub timestamp: i64,
}

impl CachedScore {
    pub fn stored_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

/// Last score per wallet address.
pub struct ScoreCache {
    entries: Mutex<LruCache<String, CachedScore>>,
    ttl: CacheTtl,
    clock: Arc<dyn Clock>,
}

impl ScoreCache {
    pub fn new(capacity: usize, ttl: CacheTtl, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        })
        .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    pub fn capacity_from_env() -> usize {
        std::env::var("REPUFI_SCORE_CACHE_CAPACITY")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn store(&self, address: &str, result: ScoreResult) -> AppResult<Option<CachedScore>> {
        let Some(key) = normalize_address(address) else {
            return Ok(None);
        };

        let entry = CachedScore {
            result,
            timestamp: self.clock.now().timestamp_millis(),
        };
        self.lock()?.put(key.clone(), entry.clone());
        debug!(target: "app::cache", address = %key, "stored score");
        Ok(Some(entry))
    }

    pub fn get(&self, address: &str) -> AppResult<Option<CachedScore>> {
        let Some(key) = normalize_address(address) else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut entries = self.lock()?;
        let stale = match entries.get(&key) {
            Some(entry) => self.ttl.is_stale(entry.stored_at(), now),
            None => return Ok(None),
        };

        if stale {
            entries.pop(&key);
            debug!(target: "app::cache", address = %key, "dropped stale score");
            return Ok(None);
        }

        Ok(entries.get(&key).cloned())
    }

    pub fn clear(&self, address: &str) -> AppResult<bool> {
        let Some(key) = normalize_address(address) else {
            return Ok(false);
        };
        Ok(self.lock()?.pop(&key).is_some())
    }

    pub fn purge_expired(&self) -> AppResult<usize> {
        if self.ttl == CacheTtl::Never {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut entries = self.lock()?;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| self.ttl.is_stale(entry.stored_at(), now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        if !stale.is_empty() {
            debug!(target: "app::cache", purged = stale.len(), "purged stale scores");
        }
        Ok(stale.len())
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, LruCache<String, CachedScore>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::other("score cache lock poisoned"))
    }
}

fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}
