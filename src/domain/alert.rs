//! Structured alerts handed to the notification collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::TenderId;
use super::tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Created, not yet handed to the notification collaborator.
    Pending,
    /// Emitted; ownership has transferred downstream.
    Emitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: String,
    pub severity: Severity,
    pub tender_id: TenderId,
    pub message: String,
    pub recommended_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliveryStatus,
}

impl Alert {
    #[must_use]
    pub fn new(
        alert_type: impl Into<String>,
        severity: Severity,
        tender_id: TenderId,
        message: impl Into<String>,
        recommended_actions: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: alert_type.into(),
            severity,
            tender_id,
            message: message.into(),
            recommended_actions,
            created_at,
            delivery: DeliveryStatus::Pending,
        }
    }
}

/// Deterministic mapping from risk-factor tags to recommended actions.
///
/// Order follows the tag order; duplicates collapse to the first occurrence.
#[must_use]
pub fn recommended_actions(risk_factors: &[String]) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    for tag in risk_factors {
        let action = match tag.as_str() {
            tags::SINGLE_BIDDER => "Investigate market conditions and bidder eligibility",
            tags::HIGH_VALUE_SINGLE_BIDDER => "Escalate for value-for-money review",
            tags::CRITICAL_SECTOR_SINGLE_BIDDER => {
                "Cross-check sector procurement plans for contract splitting"
            }
            tags::REPEAT_SINGLE_BIDDER_AUTHORITY => {
                "Audit the authority's recent single-bidder awards"
            }
            tags::ABNORMALLY_LOW_BID => "Verify the low bid covers mandatory cost components",
            tags::INFLATED_BID_PRICE => "Review estimated value calculation methodology",
            tags::ANOMALOUS_PRICE_PATTERN => "Conduct detailed price analysis and market research",
            tags::SUSPICIOUSLY_SIMILAR_BIDS => {
                "Screen bidders for collusion indicators and common ownership"
            }
            tags::UNUSUAL_BID_SPREAD => "Compare bid breakdowns against the tender specification",
            tags::HIGH_AUTHORITY_WIN_RATE => "Review market concentration and competition levels",
            tags::EXTREMELY_HIGH_AUTHORITY_WIN_RATE => {
                "Refer the authority-supplier relationship for market investigation"
            }
            tags::HIGH_SECTOR_WIN_RATE => "Benchmark the winner against sector peers",
            tags::CONSISTENT_MONTHLY_WINS => "Inspect award timing against procurement schedules",
            tags::WIN_CONCENTRATION_SPIKE => {
                "Review the concentrated award period for irregularities"
            }
            tags::HIGH_GEOGRAPHIC_CLUSTER_WIN_RATE => {
                "Review geographic market dynamics and local competition"
            }
            tags::GEOGRAPHIC_MONOPOLY_PATTERN => {
                "Investigate potential local monopolies or cartels"
            }
            tags::CLOSE_PROXIMITY_WINNER => {
                "Check relationships between the authority and the local winner"
            }
            tags::PARTIAL_ANALYSIS => "Re-run the assessment once all data sources are available",
            tags::NO_DATA => "Re-run the assessment once bids are recorded",
            t if t.starts_with(tags::SYSTEMIC_PREFIX) => {
                "Review the systemic pattern report for the involved parties"
            }
            _ => continue,
        };
        if !actions.iter().any(|a| a == action) {
            actions.push(action.to_string());
        }
    }
    actions
}
