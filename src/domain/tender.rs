//! Tender, bid, company and authority records as the engine sees them.
//!
//! These mirror the read contracts of the storage collaborator. Tenders are
//! immutable once awarded except for status transitions, and bids are never
//! mutated after award finalization, which is why assessments can run
//! lock-free on read replicas.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AuthorityId, CompanyId, TenderId};

/// WGS84 coordinates derived from a registered address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    Published,
    Evaluation,
    Awarded,
    Cancelled,
}

impl TenderStatus {
    /// Monotone rank used for data-version ordering: a status can only move
    /// forward for risk-relevant purposes.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            TenderStatus::Published => 0,
            TenderStatus::Evaluation => 1,
            TenderStatus::Awarded => 2,
            TenderStatus::Cancelled => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    pub id: TenderId,
    pub authority_id: AuthorityId,
    /// Standardized procurement category code; the 2-digit prefix denotes
    /// the broad sector.
    pub cpv_code: String,
    pub estimated_value: Option<Decimal>,
    pub currency: String,
    pub publication_date: DateTime<Utc>,
    pub status: TenderStatus,
}

impl Tender {
    /// The 2-digit sector prefix of the CPV code.
    ///
    /// Falls back to the whole code when it is shorter than two bytes or
    /// does not split on a character boundary; the field arrives from
    /// ingestion unvalidated.
    #[must_use]
    pub fn cpv_prefix(&self) -> &str {
        self.cpv_code.get(..2).unwrap_or(&self.cpv_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub tender_id: TenderId,
    pub company_id: CompanyId,
    pub amount: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub is_winner: bool,
}

/// The winning bid of a tender, if an award has been recorded.
///
/// At most one bid per tender carries the winner flag; the first match is
/// returned.
#[must_use]
pub fn winning_bid(bids: &[Bid]) -> Option<&Bid> {
    bids.iter().find(|b| b.is_winner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Micro,
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub registration_code: String,
    pub location: Option<GeoPoint>,
    pub size: Option<CompanySize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityCategory {
    Central,
    Local,
    Utility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractingAuthority {
    pub id: AuthorityId,
    pub location: Option<GeoPoint>,
    pub category: AuthorityCategory,
}

/// Version stamp of the source data an assessment was computed from.
///
/// Ordering is by last risk-relevant change, then status progress, then bid
/// count, so a result computed from fresher data always wins over a stale
/// in-flight one regardless of which finishes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataVersion {
    pub last_change: DateTime<Utc>,
    pub status_rank: u8,
    pub bid_count: u32,
}

impl DataVersion {
    #[must_use]
    pub fn of(tender: &Tender, bids: &[Bid]) -> Self {
        let last_change = bids
            .iter()
            .map(|b| b.submitted_at)
            .max()
            .unwrap_or(tender.publication_date);
        Self {
            last_change,
            status_rank: tender.status.rank(),
            bid_count: bids.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn tender_at(ts: DateTime<Utc>) -> Tender {
        Tender {
            id: TenderId::from("t-1"),
            authority_id: AuthorityId::from("a-1"),
            cpv_code: "45230000".into(),
            estimated_value: Some(dec!(500_000)),
            currency: "RON".into(),
            publication_date: ts,
            status: TenderStatus::Published,
        }
    }

    fn bid_at(ts: DateTime<Utc>, winner: bool) -> Bid {
        Bid {
            tender_id: TenderId::from("t-1"),
            company_id: CompanyId::from("c-1"),
            amount: dec!(480_000),
            submitted_at: ts,
            is_winner: winner,
        }
    }

    #[test]
    fn cpv_prefix_is_first_two_digits() {
        let t = tender_at(Utc::now());
        assert_eq!(t.cpv_prefix(), "45");
    }

    #[test]
    fn cpv_prefix_tolerates_short_and_non_ascii_codes() {
        let mut t = tender_at(Utc::now());
        t.cpv_code = "4".into();
        assert_eq!(t.cpv_prefix(), "4");
        t.cpv_code = String::new();
        assert_eq!(t.cpv_prefix(), "");
        // A three-byte leading character makes ..2 a non-boundary slice.
        t.cpv_code = "€45".into();
        assert_eq!(t.cpv_prefix(), "€45");
    }

    #[test]
    fn winning_bid_returns_flagged_bid() {
        let now = Utc::now();
        let bids = vec![bid_at(now, false), bid_at(now, true)];
        assert!(winning_bid(&bids).is_some());
        assert!(winning_bid(&bids[..1]).is_none());
    }

    #[test]
    fn data_version_orders_by_freshness() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap();

        let tender = tender_at(t0);
        let stale = DataVersion::of(&tender, &[bid_at(t0, false)]);
        let fresh = DataVersion::of(&tender, &[bid_at(t0, false), bid_at(t1, true)]);
        assert!(fresh > stale);

        // Status progress alone also advances the version.
        let mut awarded = tender_at(t0);
        awarded.status = TenderStatus::Awarded;
        let bids = vec![bid_at(t0, true)];
        assert!(DataVersion::of(&awarded, &bids) > DataVersion::of(&tender_at(t0), &bids));
    }
}
