//! Read-only queries over the procurement history.
//!
//! Served by the storage collaborator, possibly from a read replica. Tender
//! and bid data is append-only with respect to risk-relevant fields, so no
//! locking is required on this side.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    AuthorityId, Bid, Company, CompanyId, ContractingAuthority, GeoPoint, Tender, TenderId,
};
use crate::error::Result;

/// Scope for participation/win counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipationScope {
    /// Tenders of one contracting authority.
    Authority(AuthorityId),
    /// Tenders whose CPV code starts with the given sector prefix.
    Sector(String),
}

/// Participation and win counts for a company within a scope and window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Participation {
    pub participations: u32,
    pub wins: u32,
}

impl Participation {
    /// Wins over participations; 0.0 with no participations.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.participations == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.participations)
    }
}

/// A company's record across a set of authorities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterPerformance {
    pub total: u32,
    pub wins: u32,
}

impl ClusterPerformance {
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.total)
    }
}

/// One awarded tender, as fed to the batch pattern miner.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardSummary {
    pub tender_id: TenderId,
    pub authority_id: AuthorityId,
    pub company_id: CompanyId,
    pub cpv_code: String,
    pub awarded_at: DateTime<Utc>,
}

/// Read contract consumed from the storage collaborator.
///
/// Implementations must be thread-safe; all methods are read-only.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    async fn tender(&self, id: &TenderId) -> Result<Option<Tender>>;

    async fn bids_for(&self, id: &TenderId) -> Result<Vec<Bid>>;

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>>;

    async fn authority(&self, id: &AuthorityId) -> Result<Option<ContractingAuthority>>;

    /// Number of the authority's tenders since `since` that closed with
    /// exactly one bidder.
    async fn single_bidder_count(
        &self,
        authority: &AuthorityId,
        since: DateTime<Utc>,
    ) -> Result<u32>;

    /// Comparable historical bid prices: same CPV code, optionally widened
    /// with the same authority's tenders.
    async fn price_sample(
        &self,
        cpv_code: &str,
        authority: Option<&AuthorityId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decimal>>;

    async fn participation(
        &self,
        company: &CompanyId,
        scope: &ParticipationScope,
        since: DateTime<Utc>,
    ) -> Result<Participation>;

    /// Win counts bucketed by month (`YYYY-MM` keys).
    async fn monthly_wins(
        &self,
        company: &CompanyId,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u32>>;

    /// Authorities within `radius_km` great-circle distance of `point`,
    /// the reference authority included.
    async fn nearby_authorities(&self, point: GeoPoint, radius_km: f64)
        -> Result<Vec<AuthorityId>>;

    async fn cluster_performance(
        &self,
        company: &CompanyId,
        authorities: &[AuthorityId],
        since: DateTime<Utc>,
    ) -> Result<ClusterPerformance>;

    /// All awards in the window, for batch pattern mining.
    async fn award_summaries(&self, since: DateTime<Utc>) -> Result<Vec<AwardSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_rates_guard_division_by_zero() {
        assert_eq!(Participation::default().win_rate(), 0.0);
        assert_eq!(ClusterPerformance::default().win_rate(), 0.0);
        let p = Participation {
            participations: 10,
            wins: 8,
        };
        assert_eq!(p.win_rate(), 0.8);
    }
}
