// One AI drafting tip per calendar day, cached under a date-stamped key.

use std::time::Duration;

use chrono::NaiveDate;
use riftdraft_core::cache::{daily_key, ResponseCache};
use riftdraft_llm::{AiError, CacheKey, GenerateRequest, RequestManager, Validate};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::prompt;

const KEY_PREFIX: &str = "daily-insight";
const INSIGHT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyInsight {
    pub title: String,
    pub tip: String,
}

impl Validate for DailyInsight {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() || self.tip.trim().is_empty() {
            return Err("title and tip must both be present".into());
        }
        Ok(())
    }
}

/// The tip for `date`, fetched at most once per day and data version.
pub async fn daily_insight(
    requests: &RequestManager,
    cache: &ResponseCache,
    data_version: &str,
    date: NaiveDate,
    cancel: &CancellationToken,
) -> Result<DailyInsight, AiError> {
    let key = CacheKey::new(daily_key(KEY_PREFIX, date), data_version).with_ttl(INSIGHT_TTL);
    let request = GenerateRequest::new(prompt::insight_prompt(date, data_version))
        .with_system(prompt::system_prompt())
        .with_schema(prompt::insight_schema())
        .with_max_output_tokens(256);
    requests.send_cached(cache, &key, &request, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use riftdraft_core::store::MemoryStore;
    use riftdraft_llm::{AiClient, CallError, RetryPolicy};

    struct Counting(AtomicU32);

    #[async_trait]
    impl AiClient for Counting {
        async fn generate(&self, _request: &GenerateRequest) -> Result<String, CallError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"title":"Ban the flex","tip":"Flex picks hide your plan; ban theirs early."}"#.into())
        }
    }

    #[tokio::test]
    async fn one_request_per_day() {
        let client = Arc::new(Counting(AtomicU32::new(0)));
        let requests = RequestManager::new(client.clone(), RetryPolicy::none());
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let tomorrow = today.succ_opt().unwrap();

        let a = daily_insight(&requests, &cache, "14.20.1", today, &cancel).await.unwrap();
        let b = daily_insight(&requests, &cache, "14.20.1", today, &cancel).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(client.0.load(Ordering::SeqCst), 1);

        daily_insight(&requests, &cache, "14.20.1", tomorrow, &cancel).await.unwrap();
        assert_eq!(client.0.load(Ordering::SeqCst), 2);
        assert!(cache.get::<DailyInsight>("daily-insight:2026-10-19", "14.20.1").is_some());
    }
}
