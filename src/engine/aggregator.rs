//! The risk score aggregator.
//!
//! `assess(tender_id)` fans out to the four detectors in parallel, each
//! under its own timeout, joins the outcomes, composes the weighted score,
//! classifies the risk level, asks the pattern store for systemic
//! corroboration and emits alerts. Callers always receive a well-formed
//! result: detector faults degrade to a zero sub-score plus a
//! `partial_analysis` tag, and a tender with no usable data at all comes
//! back with all sub-scores zero, level `low` and a `no_data` tag.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::detector::{
    DetectionContext, Detector, FrequentWinnerDetector, GeoClusterDetector, PriceAnomalyDetector,
    SingleBidderDetector,
};
use crate::domain::{
    merge_tags, tags, winning_bid, DataVersion, Detection, RiskLevel, RiskScoreResult, Score,
    TenderId,
};
use crate::port::{AlertSink, AnomalyModel, CacheKey, Cached, EntityKind, HistoryReader, ResultCache};

use super::alerts::AlertGenerator;
use super::pattern::PatternStore;

/// Version tag stamped on every result. Bump when scoring semantics change;
/// cached results from older versions are keyed separately and never reused.
pub const ALGORITHM_VERSION: &str = "1.0.0";

pub struct RiskEngine {
    reader: Arc<dyn HistoryReader>,
    cache: Arc<dyn ResultCache>,
    patterns: Arc<PatternStore>,
    sink: Arc<dyn AlertSink>,
    alerts: AlertGenerator,
    config: Arc<Config>,
    single_bidder: SingleBidderDetector,
    price_anomaly: PriceAnomalyDetector,
    frequent_winner: FrequentWinnerDetector,
    geographic: GeoClusterDetector,
}

impl RiskEngine {
    pub fn new(
        config: Arc<Config>,
        reader: Arc<dyn HistoryReader>,
        cache: Arc<dyn ResultCache>,
        patterns: Arc<PatternStore>,
        sink: Arc<dyn AlertSink>,
        model: Arc<dyn AnomalyModel>,
    ) -> Self {
        let single_bidder =
            SingleBidderDetector::new(reader.clone(), config.single_bidder.clone());
        let price_anomaly =
            PriceAnomalyDetector::new(reader.clone(), config.price_anomaly.clone(), model);
        let frequent_winner =
            FrequentWinnerDetector::new(reader.clone(), config.frequent_winner.clone());
        let geographic = GeoClusterDetector::new(reader.clone(), config.geographic.clone());
        let alerts = AlertGenerator::new(config.alerts.clone());

        Self {
            reader,
            cache,
            patterns,
            sink,
            alerts,
            config,
            single_bidder,
            price_anomaly,
            frequent_winner,
            geographic,
        }
    }

    /// (Re)compute the risk assessment for a tender at the current instant.
    pub async fn assess(&self, tender_id: &TenderId) -> RiskScoreResult {
        self.assess_at(tender_id, Utc::now()).await
    }

    /// (Re)compute the risk assessment anchoring every trailing window at
    /// `now`. Idempotent for a fixed `now` and unchanged source data; never
    /// returns an error.
    pub async fn assess_at(&self, tender_id: &TenderId, now: DateTime<Utc>) -> RiskScoreResult {
        let tender = match self.reader.tender(tender_id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                warn!(tender_id = %tender_id, "tender not found");
                return self.degenerate_result(tender_id, now, vec![tags::NO_DATA.to_string()]);
            }
            Err(err) => {
                warn!(tender_id = %tender_id, error = %err, "tender lookup failed");
                return self.degenerate_result(tender_id, now, vec![tags::NO_DATA.to_string()]);
            }
        };

        let bids = match self.reader.bids_for(tender_id).await {
            Ok(bids) => bids,
            Err(err) => {
                warn!(tender_id = %tender_id, error = %err, "bid lookup failed");
                Vec::new()
            }
        };

        let data_version = DataVersion::of(&tender, &bids);
        let composite_key = CacheKey::new(
            EntityKind::CompositeScore,
            tender_id.as_str(),
            ALGORITHM_VERSION,
        );

        if let Some(hit) = self.cache.get(&composite_key) {
            if hit.data_version == data_version {
                if let Ok(result) = serde_json::from_value::<RiskScoreResult>(hit.value) {
                    debug!(tender_id = %tender_id, "composite cache hit");
                    return result;
                }
            }
        }

        let ctx = DetectionContext::new(tender, bids, now);
        let timeout = Duration::from_millis(self.config.engine.detector_timeout_ms);

        let (single, price, frequent, geo) = tokio::join!(
            self.run_detector(&self.single_bidder, &ctx, data_version, timeout),
            self.run_detector(&self.price_anomaly, &ctx, data_version, timeout),
            self.run_detector(&self.frequent_winner, &ctx, data_version, timeout),
            self.run_detector(&self.geographic, &ctx, data_version, timeout),
        );

        let result = self.compose(&ctx, [single, price, frequent, geo], now);

        if let Ok(value) = serde_json::to_value(&result) {
            self.cache.put(
                composite_key,
                Cached {
                    value,
                    data_version,
                },
            );
        }

        for alert in self.alerts.generate(&result) {
            self.sink.emit(alert);
        }

        info!(
            tender_id = %tender_id,
            score = result.overall_risk_score.value(),
            level = result.risk_level.as_str(),
            "assessment complete"
        );
        result
    }

    /// Run one detector under its timeout, memoized per tender/data version.
    /// Any fault collapses to `None`; the caller treats that as a zero
    /// sub-score plus `partial_analysis`.
    async fn run_detector(
        &self,
        detector: &dyn Detector,
        ctx: &DetectionContext,
        data_version: DataVersion,
        timeout: Duration,
    ) -> Option<Detection> {
        let key = CacheKey::new(
            EntityKind::DetectorResult,
            format!("{}:{}", detector.name(), ctx.tender.id),
            ALGORITHM_VERSION,
        );
        if let Some(hit) = self.cache.get(&key) {
            if hit.data_version == data_version {
                if let Ok(detection) = serde_json::from_value::<Detection>(hit.value) {
                    return Some(detection);
                }
            }
        }

        let outcome = tokio::time::timeout(timeout, detector.detect(ctx)).await;
        match outcome {
            Ok(Ok(detection)) => {
                if let Ok(value) = serde_json::to_value(&detection) {
                    self.cache.put(
                        key,
                        Cached {
                            value,
                            data_version,
                        },
                    );
                }
                Some(detection)
            }
            Ok(Err(err)) => {
                warn!(
                    tender_id = %ctx.tender.id,
                    detector = detector.name(),
                    error = %err,
                    "detector failed, isolating"
                );
                None
            }
            Err(_) => {
                warn!(
                    tender_id = %ctx.tender.id,
                    detector = detector.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "detector timed out, isolating"
                );
                None
            }
        }
    }

    fn compose(
        &self,
        ctx: &DetectionContext,
        outcomes: [Option<Detection>; 4],
        now: DateTime<Utc>,
    ) -> RiskScoreResult {
        let partial = outcomes.iter().any(Option::is_none);
        let all_failed = outcomes.iter().all(Option::is_none);
        let [single, price, frequent, geo] =
            outcomes.map(|o| o.unwrap_or_else(Detection::empty));

        let weights = &self.config.weights;
        let composite = Score::new(
            single.score.value() * weights.single_bidder
                + price.score.value() * weights.price_anomaly
                + frequent.score.value() * weights.frequent_winner
                + geo.score.value() * weights.geographic,
        );

        let mut risk_factors = merge_tags([
            single.tags.as_slice(),
            price.tags.as_slice(),
            frequent.tags.as_slice(),
            geo.tags.as_slice(),
        ]);
        if partial {
            risk_factors.push(tags::PARTIAL_ANALYSIS.to_string());
        }
        if all_failed {
            risk_factors.push(tags::NO_DATA.to_string());
        }

        // Systemic corroboration: advisory tags only, never a score input,
        // so the composite stays a pure function of the four sub-scores.
        let winner = winning_bid(&ctx.bids).map(|b| b.company_id.clone());
        for pattern in self
            .patterns
            .matching(&ctx.tender.authority_id, winner.as_ref())
        {
            let tag = format!("{}{}", tags::SYSTEMIC_PREFIX, pattern.kind.as_str());
            if !risk_factors.iter().any(|t| t == &tag) {
                risk_factors.push(tag);
            }
        }

        RiskScoreResult {
            tender_id: ctx.tender.id.clone(),
            overall_risk_score: composite,
            risk_level: RiskLevel::from_score(composite.value(), &self.config.levels),
            single_bidder_risk: single.score,
            price_anomaly_risk: price.score,
            frequency_risk: frequent.score,
            geographic_risk: geo.score,
            risk_factors,
            analysis_date: now,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }

    /// Well-formed result for a tender the engine could not read at all.
    fn degenerate_result(
        &self,
        tender_id: &TenderId,
        now: DateTime<Utc>,
        risk_factors: Vec<String>,
    ) -> RiskScoreResult {
        RiskScoreResult {
            tender_id: tender_id.clone(),
            overall_risk_score: Score::zero(),
            risk_level: RiskLevel::Low,
            single_bidder_risk: Score::zero(),
            price_anomaly_risk: Score::zero(),
            frequency_risk: Score::zero(),
            geographic_risk: Score::zero(),
            risk_factors,
            analysis_date: now,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }
}
