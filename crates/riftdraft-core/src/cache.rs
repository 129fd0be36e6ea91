// TTL-bound, version-tagged response cache on top of a `KeyValueStore`.
//
// Every entry is stored as a JSON envelope `{timestamp, version, data}`.
// Anything that fails to decode is evicted on read and reported as a miss.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

/// Default validity window for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// The persisted envelope around a cached value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
}

/// Build a date-stamped key, e.g. `daily-insight:2026-10-19`. Values stored
/// under such keys are naturally scoped to one calendar day.
pub fn daily_key(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}:{}", date.format("%Y-%m-%d"))
}

pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`, returning `None` when absent, stale, from a different
    /// version, or undecodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, expected_version: &str) -> Option<T> {
        self.lookup(key, expected_version, self.ttl, Utc::now())
    }

    /// Like `get`, evaluated at an explicit instant.
    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        expected_version: &str,
        now: DateTime<Utc>,
    ) -> Option<T> {
        self.lookup(key, expected_version, self.ttl, now)
    }

    /// Like `get`, with a caller-supplied freshness window in place of the
    /// cache-wide TTL.
    pub fn get_with_ttl<T: DeserializeOwned>(
        &self,
        key: &str,
        expected_version: &str,
        ttl: Duration,
    ) -> Option<T> {
        self.lookup(key, expected_version, ttl, Utc::now())
    }

    /// Store `data` under `key` stamped with the current time, replacing any
    /// previous entry.
    pub fn put<T: Serialize>(&self, key: &str, data: &T, version: &str) -> Result<(), StoreError> {
        self.put_at(key, data, version, Utc::now())
    }

    pub fn put_at<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        version: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry {
            timestamp: now,
            version: version.to_string(),
            data,
        };
        let json = serde_json::to_string(&entry).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)?;
        debug!(key, version, "cache put");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.remove(key)
    }

    /// Delete every entry under `prefix` that is stale at `now` or cannot be
    /// decoded. Returns how many entries were removed.
    pub fn purge_expired(&self, prefix: &str, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.store.keys_with_prefix(prefix)? {
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            let keep = serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw)
                .map(|entry| !is_stale(entry.timestamp, now, self.ttl))
                .unwrap_or(false);
            if !keep {
                self.store.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn lookup<T: DeserializeOwned>(
        &self,
        key: &str,
        expected_version: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "evicting corrupt cache entry");
                if let Err(e) = self.store.remove(key) {
                    warn!(key, error = %e, "failed to evict corrupt cache entry");
                }
                return None;
            }
        };

        if entry.version != expected_version {
            debug!(key, stored = %entry.version, expected_version, "cache version mismatch");
            return None;
        }
        if is_stale(entry.timestamp, now, ttl) {
            debug!(key, "cache entry expired");
            return None;
        }

        debug!(key, "cache hit");
        Some(entry.data)
    }
}

/// An entry is stale once strictly more than `ttl` has elapsed. Timestamps
/// from the future count as fresh.
fn is_stale(stored: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - stored).to_std() {
        Ok(age) => age > ttl,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn cache_with_store() -> (ResponseCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = ResponseCache::new(store.clone(), DEFAULT_TTL);
        (cache, store)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn get_immediately_after_put_hits() {
        let (cache, _) = cache_with_store();
        cache.put_at("k", &vec![1, 2, 3], "v1", t0()).unwrap();
        let hit: Option<Vec<i32>> = cache.get_at("k", "v1", t0());
        assert_eq!(hit, Some(vec![1, 2, 3]));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, _) = cache_with_store();
        cache.put_at("k", &"data", "v1", t0()).unwrap();

        let at_ttl = t0() + chrono::Duration::seconds(3600);
        assert_eq!(cache.get_at::<String>("k", "v1", at_ttl).as_deref(), Some("data"));

        let past_ttl = t0() + chrono::Duration::seconds(3601);
        assert_eq!(cache.get_at::<String>("k", "v1", past_ttl), None);
    }

    #[test]
    fn version_mismatch_is_a_miss_within_ttl() {
        let (cache, _) = cache_with_store();
        cache.put_at("k", &"data", "v1", t0()).unwrap();
        assert_eq!(cache.get_at::<String>("k", "v2", t0()), None);
        // The stored entry is untouched for callers still on v1.
        assert!(cache.get_at::<String>("k", "v1", t0()).is_some());
    }

    #[test]
    fn corrupt_entry_is_evicted_not_thrown() {
        let (cache, store) = cache_with_store();
        store.set("k", "{not json").unwrap();

        assert_eq!(cache.get_at::<String>("k", "v1", t0()), None);
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn wrong_shape_is_evicted() {
        let (cache, store) = cache_with_store();
        cache.put_at("k", &"text", "v1", t0()).unwrap();

        assert_eq!(cache.get_at::<Vec<u32>>("k", "v1", t0()), None);
        assert!(store.is_empty());
    }

    #[test]
    fn put_overwrites_unconditionally() {
        let (cache, _) = cache_with_store();
        cache.put_at("k", &1, "v1", t0()).unwrap();
        cache.put_at("k", &2, "v2", t0()).unwrap();
        assert_eq!(cache.get_at::<i32>("k", "v2", t0()), Some(2));
        assert_eq!(cache.get_at::<i32>("k", "v1", t0()), None);
    }

    #[test]
    fn custom_ttl_overrides_default() {
        let (cache, _) = cache_with_store();
        cache
            .put_at("k", &"x", "v1", Utc::now() - chrono::Duration::hours(2))
            .unwrap();

        assert_eq!(cache.get::<String>("k", "v1"), None);
        let six_hours = Duration::from_secs(6 * 60 * 60);
        assert_eq!(
            cache.get_with_ttl::<String>("k", "v1", six_hours).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let (cache, _) = cache_with_store();
        cache
            .put_at("k", &"x", "v1", t0() + chrono::Duration::minutes(5))
            .unwrap();
        assert!(cache.get_at::<String>("k", "v1", t0()).is_some());
    }

    #[test]
    fn purge_expired_removes_stale_and_corrupt() {
        let (cache, store) = cache_with_store();
        cache.put_at("ai:old", &1, "v1", t0()).unwrap();
        cache
            .put_at("ai:new", &2, "v1", t0() + chrono::Duration::hours(2))
            .unwrap();
        store.set("ai:bad", "garbage").unwrap();
        store.set("other:old", "garbage").unwrap();

        let removed = cache
            .purge_expired("ai:", t0() + chrono::Duration::hours(2))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.keys_with_prefix("ai:").unwrap(), vec!["ai:new"]);
        assert!(store.get("other:old").unwrap().is_some());
    }

    #[test]
    fn daily_key_uses_calendar_date() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(daily_key("daily-insight", date), "daily-insight:2026-01-05");
    }

    #[test]
    fn envelope_layout_is_stable() {
        let (cache, store) = cache_with_store();
        cache.put_at("k", &serde_json::json!({"a": 1}), "v9", t0()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&store.get("k").unwrap().unwrap()).unwrap();
        assert_eq!(raw["version"], "v9");
        assert_eq!(raw["data"]["a"], 1);
        assert!(raw["timestamp"].as_str().unwrap().starts_with("2026-10-19T12:00:00"));
    }
}
