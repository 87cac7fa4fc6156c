//! Systemic cross-tender patterns produced by the batch miner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AuthorityId, CompanyId, TenderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// One company holds the bulk of an authority's awards.
    CompanyMonopoly,
    /// An authority sends the bulk of its awards to one company.
    AuthorityFavoritism,
    /// One company dominates a CPV sector.
    SectorConcentration,
    /// A company's wins bunch into a narrow time window.
    TemporalClustering,
}

impl PatternKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PatternKind::CompanyMonopoly => "company_monopoly",
            PatternKind::AuthorityFavoritism => "authority_favoritism",
            PatternKind::SectorConcentration => "sector_concentration",
            PatternKind::TemporalClustering => "temporal_clustering",
        }
    }
}

/// An immutable snapshot of a systemic finding.
///
/// Patterns are advisory context for per-tender scoring: the aggregator
/// reads them to corroborate a score and compose alerts, never as a hard
/// input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub tenders: Vec<TenderId>,
    pub companies: Vec<CompanyId>,
    pub authorities: Vec<AuthorityId>,
    /// Strength of the pattern in [0,100].
    pub score: f64,
    pub discovered_at: DateTime<Utc>,
    pub active: bool,
}

impl Pattern {
    /// Whether the pattern involves the given authority or company.
    #[must_use]
    pub fn involves(&self, authority: &AuthorityId, company: Option<&CompanyId>) -> bool {
        if self.authorities.contains(authority) {
            return true;
        }
        company.is_some_and(|c| self.companies.contains(c))
    }
}
