//! Best-effort quote cache.
//!
//! Every fault in here is absorbed: a broken or unreachable store degrades
//! to a miss on read and to a no-op on write, logged at `warn`.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::store::{KeyValueStore, StoreError};
use crate::observability::metrics;
use crate::rates::{CurrencyCode, Quote};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cache entry is not a valid quote: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage key for a currency's quote.
pub fn key_for(currency: &CurrencyCode) -> String {
    format!("{currency}:exchange-rates")
}

#[derive(Clone)]
pub struct RateCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl RateCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached quote, or `None` on miss, expiry or any fault.
    pub async fn get(&self, currency: &CurrencyCode) -> Option<Quote> {
        match self.try_get(currency).await {
            Ok(hit) => {
                metrics::record_cache_lookup(currency, hit.is_some());
                hit
            }
            Err(e) => {
                tracing::warn!(currency = %currency, error = %e, "Cache read failed, treating as miss");
                metrics::record_cache_lookup(currency, false);
                None
            }
        }
    }

    /// Store `quote`, replacing any previous entry.
    pub async fn set(&self, currency: &CurrencyCode, quote: &Quote) {
        if let Err(e) = self.try_set(currency, quote).await {
            tracing::warn!(currency = %currency, error = %e, "Cache write failed");
        }
    }

    /// Drop the entry for `currency`, if any.
    pub async fn invalidate(&self, currency: &CurrencyCode) {
        match self.store.del(&key_for(currency)).await {
            Ok(()) => tracing::debug!(currency = %currency, "Cache entry invalidated"),
            Err(e) => {
                tracing::warn!(currency = %currency, error = %e, "Cache invalidation failed")
            }
        }
    }

    async fn try_get(&self, currency: &CurrencyCode) -> Result<Option<Quote>, CacheError> {
        let Some(raw) = self.store.get(&key_for(currency)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn try_set(&self, currency: &CurrencyCode, quote: &Quote) -> Result<(), CacheError> {
        let raw = serde_json::to_string(quote)?;
        self.store.set_ex(&key_for(currency), raw, self.ttl).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct Unreachable;

    #[async_trait]
    impl KeyValueStore for Unreachable {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn del(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn eur() -> CurrencyCode {
        "EUR".parse().unwrap()
    }

    fn quote() -> Quote {
        Quote::new(eur(), "Euro", dec!(6.125), dec!(6.129), dec!(6.118), "2026-01-20T14:30:00.000Z").unwrap()
    }

    #[test]
    fn test_key_format() {
        assert_eq!(key_for(&eur()), "EUR:exchange-rates");
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = Arc::new(MemoryStore::new());
        let cache = RateCache::new(store.clone(), Duration::from_secs(60));

        assert_eq!(cache.get(&eur()).await, None);
        cache.set(&eur(), &quote()).await;
        assert_eq!(cache.get(&eur()).await, Some(quote()));
        assert!(store.get("EUR:exchange-rates").await.unwrap().is_some());

        cache.invalidate(&eur()).await;
        assert_eq!(cache.get(&eur()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_with_ttl() {
        let cache = RateCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        cache.set(&eur(), &quote()).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(&eur()).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = RateCache::new(store.clone(), Duration::from_secs(60));

        store
            .set_ex("EUR:exchange-rates", "{not json".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&eur()).await, None);

        // valid JSON, invalid quote
        let negative = r#"{"currency":"EUR","name":"Euro","buy":"-1","sell":"1","previousClose":"1","lastUpdate":"t"}"#;
        store
            .set_ex("EUR:exchange-rates", negative.into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&eur()).await, None);
    }

    #[tokio::test]
    async fn test_store_faults_are_absorbed() {
        let cache = RateCache::new(Arc::new(Unreachable), Duration::from_secs(60));

        assert_eq!(cache.get(&eur()).await, None);
        cache.set(&eur(), &quote()).await;
        cache.invalidate(&eur()).await;
    }
}
