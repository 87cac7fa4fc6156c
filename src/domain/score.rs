//! Scores, risk levels and the composite assessment result.
//!
//! All score arithmetic clamps to [0,100]; a configuration or detector bug
//! can never push a stored score out of range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TenderId;
use crate::config::LevelThresholds;

/// A sub-score or composite score, clamped to [0,100] on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    pub const MAX: f64 = 100.0;

    #[must_use]
    pub fn zero() -> Self {
        Self(0.0)
    }

    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, Self::MAX))
    }

    /// Add points, saturating at 100.
    pub fn add(&mut self, points: f64) {
        self.0 = (self.0 + points).clamp(0.0, Self::MAX);
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Coarse risk bucket derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    #[must_use]
    pub fn from_score(score: f64, thresholds: &LevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Output of a single detector run: sub-score, risk-factor tags and a
/// structured detail record for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub score: Score,
    pub tags: Vec<String>,
    pub details: serde_json::Value,
}

impl Detection {
    /// An empty detection: the tender is not assessable by this detector
    /// (no bids yet, missing coordinates). Zero score, no tags.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            score: Score::zero(),
            tags: Vec::new(),
            details: serde_json::json!({}),
        }
    }
}

impl Default for Detection {
    fn default() -> Self {
        Self::empty()
    }
}

/// Union of tag lists, order-preserving, de-duplicated.
#[must_use]
pub fn merge_tags<'a, I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut merged: Vec<String> = Vec::new();
    for list in lists {
        for tag in list {
            if !merged.iter().any(|t| t == tag) {
                merged.push(tag.clone());
            }
        }
    }
    merged
}

/// The composite assessment for one tender.
///
/// Serializes to the wire shape consumed by dashboards and the notification
/// collaborator. Results are append-only history downstream: a recomputation
/// supersedes, never overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub tender_id: TenderId,
    pub overall_risk_score: Score,
    pub risk_level: RiskLevel,
    pub single_bidder_risk: Score,
    pub price_anomaly_risk: Score,
    pub frequency_risk: Score,
    pub geographic_risk: Score,
    pub risk_factors: Vec<String>,
    pub analysis_date: DateTime<Utc>,
    pub algorithm_version: String,
}
