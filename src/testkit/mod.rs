//! Fixtures and fakes for exercising the engine without a storage
//! collaborator. Compiled for this crate's own tests and for downstream
//! crates via the `testkit` feature.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::stats::{haversine_km, month_key};
use crate::domain::{
    AuthorityCategory, AuthorityId, Bid, Company, CompanyId, ContractingAuthority, GeoPoint,
    Tender, TenderId, TenderStatus,
};
use crate::error::Result;
use crate::port::{
    AwardSummary, ClusterPerformance, HistoryReader, Participation, ParticipationScope,
};

/// Mid-month reference instant, so day arithmetic in fixtures stays inside
/// predictable month buckets.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

#[must_use]
pub fn tender(
    id: &str,
    authority: &str,
    cpv_code: &str,
    estimated_value: Decimal,
    published: DateTime<Utc>,
) -> Tender {
    Tender {
        id: TenderId::from(id),
        authority_id: AuthorityId::from(authority),
        cpv_code: cpv_code.to_string(),
        estimated_value: Some(estimated_value),
        currency: "RON".to_string(),
        publication_date: published,
        status: TenderStatus::Awarded,
    }
}

#[must_use]
pub fn bid(
    tender: &str,
    company: &str,
    amount: Decimal,
    is_winner: bool,
    submitted_at: DateTime<Utc>,
) -> Bid {
    Bid {
        tender_id: TenderId::from(tender),
        company_id: CompanyId::from(company),
        amount,
        submitted_at,
        is_winner,
    }
}

#[must_use]
pub fn company(id: &str, lat: f64, lon: f64) -> Company {
    Company {
        id: CompanyId::from(id),
        registration_code: format!("RO-{id}"),
        location: Some(GeoPoint::new(lat, lon)),
        size: None,
    }
}

#[must_use]
pub fn authority(id: &str, lat: f64, lon: f64) -> ContractingAuthority {
    ContractingAuthority {
        id: AuthorityId::from(id),
        location: Some(GeoPoint::new(lat, lon)),
        category: AuthorityCategory::Local,
    }
}

/// In-memory [`HistoryReader`] deriving every query from a stored dataset,
/// so fixtures describe tenders once and all aggregates stay consistent.
#[derive(Default)]
pub struct MemoryHistory {
    tenders: Vec<(Tender, Vec<Bid>)>,
    companies: BTreeMap<CompanyId, Company>,
    authorities: BTreeMap<AuthorityId, ContractingAuthority>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tender(&mut self, tender: Tender) {
        self.tenders.push((tender, Vec::new()));
    }

    pub fn add_tender_with_bids(&mut self, tender: Tender, bids: Vec<Bid>) {
        self.tenders.push((tender, bids));
    }

    pub fn add_company(&mut self, company: Company) {
        self.companies.insert(company.id.clone(), company);
    }

    pub fn add_authority(&mut self, authority: ContractingAuthority) {
        self.authorities.insert(authority.id.clone(), authority);
    }

    fn in_window<'a>(
        &'a self,
        since: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a (Tender, Vec<Bid>)> {
        self.tenders
            .iter()
            .filter(move |(t, _)| t.publication_date >= since)
    }
}

#[async_trait]
impl HistoryReader for MemoryHistory {
    async fn tender(&self, id: &TenderId) -> Result<Option<Tender>> {
        Ok(self
            .tenders
            .iter()
            .find(|(t, _)| &t.id == id)
            .map(|(t, _)| t.clone()))
    }

    async fn bids_for(&self, id: &TenderId) -> Result<Vec<Bid>> {
        Ok(self
            .tenders
            .iter()
            .find(|(t, _)| &t.id == id)
            .map(|(_, b)| b.clone())
            .unwrap_or_default())
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>> {
        Ok(self.companies.get(id).cloned())
    }

    async fn authority(&self, id: &AuthorityId) -> Result<Option<ContractingAuthority>> {
        Ok(self.authorities.get(id).cloned())
    }

    async fn single_bidder_count(
        &self,
        authority: &AuthorityId,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        Ok(self
            .in_window(since)
            .filter(|(t, bids)| &t.authority_id == authority && bids.len() == 1)
            .count() as u32)
    }

    async fn price_sample(
        &self,
        cpv_code: &str,
        authority: Option<&AuthorityId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decimal>> {
        let mut sample = Vec::new();
        for (t, bids) in self.in_window(since) {
            let comparable = t.cpv_code == cpv_code
                || authority.is_some_and(|a| &t.authority_id == a);
            if comparable {
                sample.extend(bids.iter().map(|b| b.amount));
            }
        }
        Ok(sample)
    }

    async fn participation(
        &self,
        company: &CompanyId,
        scope: &ParticipationScope,
        since: DateTime<Utc>,
    ) -> Result<Participation> {
        let mut p = Participation::default();
        for (t, bids) in self.in_window(since) {
            let in_scope = match scope {
                ParticipationScope::Authority(a) => &t.authority_id == a,
                ParticipationScope::Sector(prefix) => t.cpv_code.starts_with(prefix.as_str()),
            };
            if !in_scope {
                continue;
            }
            if let Some(bid) = bids.iter().find(|b| &b.company_id == company) {
                p.participations += 1;
                if bid.is_winner {
                    p.wins += 1;
                }
            }
        }
        Ok(p)
    }

    async fn monthly_wins(
        &self,
        company: &CompanyId,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u32>> {
        let mut months: BTreeMap<String, u32> = BTreeMap::new();
        for (_, bids) in self.in_window(since) {
            for bid in bids {
                if &bid.company_id == company && bid.is_winner {
                    *months.entry(month_key(bid.submitted_at)).or_default() += 1;
                }
            }
        }
        Ok(months)
    }

    async fn nearby_authorities(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<AuthorityId>> {
        Ok(self
            .authorities
            .values()
            .filter(|a| {
                a.location
                    .is_some_and(|loc| haversine_km(point, loc) <= radius_km)
            })
            .map(|a| a.id.clone())
            .collect())
    }

    async fn cluster_performance(
        &self,
        company: &CompanyId,
        authorities: &[AuthorityId],
        since: DateTime<Utc>,
    ) -> Result<ClusterPerformance> {
        let mut perf = ClusterPerformance::default();
        for (t, bids) in self.in_window(since) {
            if !authorities.contains(&t.authority_id) {
                continue;
            }
            if let Some(bid) = bids.iter().find(|b| &b.company_id == company) {
                perf.total += 1;
                if bid.is_winner {
                    perf.wins += 1;
                }
            }
        }
        Ok(perf)
    }

    async fn award_summaries(&self, since: DateTime<Utc>) -> Result<Vec<AwardSummary>> {
        let mut awards = Vec::new();
        for (t, bids) in self.in_window(since) {
            if let Some(winner) = bids.iter().find(|b| b.is_winner) {
                awards.push(AwardSummary {
                    tender_id: t.id.clone(),
                    authority_id: t.authority_id.clone(),
                    company_id: winner.company_id.clone(),
                    cpv_code: t.cpv_code.clone(),
                    awarded_at: winner.submitted_at,
                });
            }
        }
        Ok(awards)
    }
}

/// Wraps a reader and delays the comparable-price query, for exercising
/// per-detector timeouts.
pub struct SlowReader<R> {
    inner: R,
    delay: Duration,
}

impl<R> SlowReader<R> {
    #[must_use]
    pub fn new(inner: R, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<R: HistoryReader> HistoryReader for SlowReader<R> {
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
        tokio::time::sleep(self.delay).await;
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
