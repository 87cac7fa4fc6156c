//! Turns finished assessments into alerts.
//!
//! One alert per firing rule, all carrying the same recommended actions
//! derived from the result's risk factors. Emission is fire-and-forget:
//! the sink owns delivery, the generator only decides what fires.

use crate::config::AlertConfig;
use crate::domain::{recommended_actions, Alert, RiskScoreResult, Severity};

pub struct AlertGenerator {
    config: AlertConfig,
}

impl AlertGenerator {
    #[must_use]
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// Alerts warranted by a finished assessment, in rule order:
    /// composite first, then per-detector.
    #[must_use]
    pub fn generate(&self, result: &RiskScoreResult) -> Vec<Alert> {
        let actions = recommended_actions(&result.risk_factors);
        let mut alerts = Vec::new();

        let composite = result.overall_risk_score.value();
        if composite >= self.config.high_risk_threshold {
            alerts.push(Alert::new(
                "high_risk_tender",
                self.severity_for(composite),
                result.tender_id.clone(),
                format!("Composite corruption risk score {composite:.1}"),
                actions.clone(),
                result.analysis_date,
            ));
        }

        let detectors = [
            (
                "single_bidder",
                result.single_bidder_risk.value(),
                self.config.single_bidder_alert,
            ),
            (
                "price_anomaly",
                result.price_anomaly_risk.value(),
                self.config.price_anomaly_alert,
            ),
            (
                "frequent_winner",
                result.frequency_risk.value(),
                self.config.frequent_winner_alert,
            ),
            (
                "geographic_clustering",
                result.geographic_risk.value(),
                self.config.geographic_alert,
            ),
        ];

        for (name, score, threshold) in detectors {
            if score >= threshold {
                alerts.push(Alert::new(
                    name,
                    self.severity_for(score),
                    result.tender_id.clone(),
                    format!("{name} risk score {score:.1}"),
                    actions.clone(),
                    result.analysis_date,
                ));
            }
        }

        alerts
    }

    fn severity_for(&self, score: f64) -> Severity {
        if score >= self.config.severe_threshold {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}
