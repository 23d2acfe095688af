//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use slm_core::config::cache::MemoryCacheConfig;
use slm_core::result::AppResult;
use slm_core::traits::CacheProvider;

/// A cache entry. Flags only need presence, so just the TTL is kept.
#[derive(Debug, Clone)]
struct Entry {
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory cache provider using moka.
///
/// Only coordinates tasks inside one process; deployments running several
/// processes must use the Redis provider.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    /// Create a cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }

    fn entry(ttl: Duration) -> Entry {
        Entry { ttl }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn set(&self, key: &str, _value: &str, ttl: Duration) -> AppResult<()> {
        self.cache.insert(key.to_string(), Self::entry(ttl)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.get(key).await.is_some())
    }

    async fn set_nx(&self, key: &str, _value: &str, ttl: Duration) -> AppResult<bool> {
        // The entry API runs the init future for at most one caller per key.
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async { Self::entry(ttl) })
            .await;
        Ok(entry.is_fresh())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_exists_delete() {
        let provider = make_provider();
        provider
            .set("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(provider.exists("key1").await.unwrap());

        provider.delete("key1").await.unwrap();
        assert!(!provider.exists("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_own_ttl() {
        let provider = make_provider();
        provider
            .set("short", "x", Duration::from_millis(50))
            .await
            .unwrap();
        provider
            .set("long", "y", Duration::from_secs(60))
            .await
            .unwrap();

        std::thread::sleep(Duration::from_millis(200));

        assert!(!provider.exists("short").await.unwrap());
        assert!(provider.exists("long").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_nx() {
        let provider = make_provider();
        assert!(provider.set_nx("nx", "a", Duration::from_secs(60)).await.unwrap());
        assert!(!provider.set_nx("nx", "b", Duration::from_secs(60)).await.unwrap());

        provider.delete("nx").await.unwrap();
        assert!(provider.set_nx("nx", "c", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_nx_after_expiry() {
        let provider = make_provider();
        assert!(provider.set_nx("lease", "1", Duration::from_millis(50)).await.unwrap());
        std::thread::sleep(Duration::from_millis(200));
        assert!(provider.set_nx("lease", "2", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_nx_single_winner() {
        let provider = Arc::new(make_provider());
        let mut handles = Vec::new();
        for i in 0..32 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                provider
                    .set_nx("race", &i.to_string(), Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
