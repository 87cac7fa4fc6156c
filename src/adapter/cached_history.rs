//! Caching decorator over the history port.
//!
//! Comparable-price samples and monthly win series aggregate many rows and
//! move slowly, so they are memoized in the result cache under the
//! historical-aggregate TTL class. Entity lookups and everything else pass
//! straight through. Aggregate entries are versioned by their window start:
//! a fresher trailing window supersedes an older one under the same key.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::domain::{
    AuthorityId, Bid, Company, CompanyId, ContractingAuthority, DataVersion, GeoPoint, Tender,
    TenderId,
};
use crate::error::Result;
use crate::port::{
    AwardSummary, CacheKey, Cached, ClusterPerformance, EntityKind, HistoryReader, Participation,
    ParticipationScope, ResultCache,
};

/// Key version for aggregate entries; bump when the cached shape changes.
const AGGREGATE_VERSION: &str = "1";

pub struct CachedHistory {
    inner: Arc<dyn HistoryReader>,
    cache: Arc<dyn ResultCache>,
}

impl CachedHistory {
    #[must_use]
    pub fn new(inner: Arc<dyn HistoryReader>, cache: Arc<dyn ResultCache>) -> Self {
        Self { inner, cache }
    }

    fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let hit = self.cache.get(key)?;
        serde_json::from_value(hit.value).ok()
    }

    fn store<T: Serialize>(&self, key: CacheKey, value: &T, since: DateTime<Utc>) {
        if let Ok(value) = serde_json::to_value(value) {
            self.cache.put(
                key,
                Cached {
                    value,
                    data_version: window_version(since),
                },
            );
        }
    }
}

fn window_version(since: DateTime<Utc>) -> DataVersion {
    DataVersion {
        last_change: since,
        status_rank: 0,
        bid_count: 0,
    }
}

#[async_trait]
impl HistoryReader for CachedHistory {
    async fn tender(&self, id: &TenderId) -> Result<Option<Tender>> {
        self.inner.tender(id).await
    }

    async fn bids_for(&self, id: &TenderId) -> Result<Vec<Bid>> {
        self.inner.bids_for(id).await
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>> {
        self.inner.company(id).await
    }

    async fn authority(&self, id: &AuthorityId) -> Result<Option<ContractingAuthority>> {
        self.inner.authority(id).await
    }

    async fn single_bidder_count(
        &self,
        authority: &AuthorityId,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        self.inner.single_bidder_count(authority, since).await
    }

    async fn price_sample(
        &self,
        cpv_code: &str,
        authority: Option<&AuthorityId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decimal>> {
        let key = CacheKey::new(
            EntityKind::HistoricalAggregate,
            format!(
                "prices:{cpv_code}:{}:{}",
                authority.map_or("-", AuthorityId::as_str),
                since.date_naive()
            ),
            AGGREGATE_VERSION,
        );
        if let Some(sample) = self.lookup::<Vec<Decimal>>(&key) {
            trace!(entity_id = %key.entity_id, "price sample served from cache");
            return Ok(sample);
        }
        let sample = self.inner.price_sample(cpv_code, authority, since).await?;
        self.store(key, &sample, since);
        Ok(sample)
    }

    async fn participation(
        &self,
        company: &CompanyId,
        scope: &ParticipationScope,
        since: DateTime<Utc>,
    ) -> Result<Participation> {
        self.inner.participation(company, scope, since).await
    }

    async fn monthly_wins(
        &self,
        company: &CompanyId,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u32>> {
        let key = CacheKey::new(
            EntityKind::HistoricalAggregate,
            format!("monthly:{company}:{}", since.date_naive()),
            AGGREGATE_VERSION,
        );
        if let Some(months) = self.lookup::<BTreeMap<String, u32>>(&key) {
            trace!(entity_id = %key.entity_id, "monthly wins served from cache");
            return Ok(months);
        }
        let months = self.inner.monthly_wins(company, since).await?;
        self.store(key, &months, since);
        Ok(months)
    }

    async fn nearby_authorities(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<AuthorityId>> {
        self.inner.nearby_authorities(point, radius_km).await
    }

    async fn cluster_performance(
        &self,
        company: &CompanyId,
        authorities: &[AuthorityId],
        since: DateTime<Utc>,
    ) -> Result<ClusterPerformance> {
        self.inner
            .cluster_performance(company, authorities, since)
            .await
    }

    async fn award_summaries(&self, since: DateTime<Utc>) -> Result<Vec<AwardSummary>> {
        self.inner.award_summaries(since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryCache;
    use crate::config::CacheConfig;
    use crate::testkit::{self, MemoryHistory};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts aggregate reads passed through to the wrapped reader.
    struct CountingHistory {
        inner: MemoryHistory,
        price_reads: AtomicUsize,
    }

    impl CountingHistory {
        fn new(inner: MemoryHistory) -> Self {
            Self {
                inner,
                price_reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HistoryReader for CountingHistory {
        async fn tender(&self, id: &TenderId) -> Result<Option<Tender>> {
            self.inner.tender(id).await
        }

        async fn bids_for(&self, id: &TenderId) -> Result<Vec<Bid>> {
            self.inner.bids_for(id).await
        }

        async fn company(&self, id: &CompanyId) -> Result<Option<Company>> {
            self.inner.company(id).await
        }

        async fn authority(&self, id: &AuthorityId) -> Result<Option<ContractingAuthority>> {
            self.inner.authority(id).await
        }

        async fn single_bidder_count(
            &self,
            authority: &AuthorityId,
            since: DateTime<Utc>,
        ) -> Result<u32> {
            self.inner.single_bidder_count(authority, since).await
        }

        async fn price_sample(
            &self,
            cpv_code: &str,
            authority: Option<&AuthorityId>,
            since: DateTime<Utc>,
        ) -> Result<Vec<Decimal>> {
            self.price_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.price_sample(cpv_code, authority, since).await
        }

        async fn participation(
            &self,
            company: &CompanyId,
            scope: &ParticipationScope,
            since: DateTime<Utc>,
        ) -> Result<Participation> {
            self.inner.participation(company, scope, since).await
        }

        async fn monthly_wins(
            &self,
            company: &CompanyId,
            since: DateTime<Utc>,
        ) -> Result<BTreeMap<String, u32>> {
            self.inner.monthly_wins(company, since).await
        }

        async fn nearby_authorities(
            &self,
            point: GeoPoint,
            radius_km: f64,
        ) -> Result<Vec<AuthorityId>> {
            self.inner.nearby_authorities(point, radius_km).await
        }

        async fn cluster_performance(
            &self,
            company: &CompanyId,
            authorities: &[AuthorityId],
            since: DateTime<Utc>,
        ) -> Result<ClusterPerformance> {
            self.inner
                .cluster_performance(company, authorities, since)
                .await
        }

        async fn award_summaries(&self, since: DateTime<Utc>) -> Result<Vec<AwardSummary>> {
            self.inner.award_summaries(since).await
        }
    }

    fn seeded() -> MemoryHistory {
        let now = testkit::fixed_now();
        let mut history = MemoryHistory::new();
        let when = now - Duration::days(30);
        let t = testkit::tender("t-1", "a-1", "45230000", dec!(100_000), when);
        let b = vec![testkit::bid("t-1", "c-1", dec!(95_000), true, when)];
        history.add_tender_with_bids(t, b);
        history
    }

    #[tokio::test]
    async fn repeated_price_samples_hit_the_cache() {
        let counting = Arc::new(CountingHistory::new(seeded()));
        let cached = CachedHistory::new(
            counting.clone(),
            Arc::new(MemoryCache::new(CacheConfig::default())),
        );
        let since = testkit::fixed_now() - Duration::days(365);

        let first = cached.price_sample("45230000", None, since).await.unwrap();
        let second = cached.price_sample("45230000", None, since).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, vec![dec!(95_000)]);
        assert_eq!(counting.price_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_aggregate_ttl_disables_memoization() {
        let counting = Arc::new(CountingHistory::new(seeded()));
        let cache = MemoryCache::new(CacheConfig {
            aggregate_ttl_secs: 0,
            ..CacheConfig::default()
        });
        let cached = CachedHistory::new(counting.clone(), Arc::new(cache));
        let since = testkit::fixed_now() - Duration::days(365);

        cached.price_sample("45230000", None, since).await.unwrap();
        cached.price_sample("45230000", None, since).await.unwrap();
        assert_eq!(counting.price_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn monthly_wins_are_memoized_per_window() {
        let counting = Arc::new(CountingHistory::new(seeded()));
        let cached = CachedHistory::new(
            counting,
            Arc::new(MemoryCache::new(CacheConfig::default())),
        );
        let now = testkit::fixed_now();

        let company = CompanyId::from("c-1");
        let wide = cached
            .monthly_wins(&company, now - Duration::days(365))
            .await
            .unwrap();
        // A different window start is a different cache entry.
        let narrow = cached
            .monthly_wins(&company, now - Duration::days(7))
            .await
            .unwrap();

        assert_eq!(wide.values().sum::<u32>(), 1);
        assert!(narrow.is_empty());
    }
}
