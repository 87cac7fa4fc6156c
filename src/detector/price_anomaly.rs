//! Statistical price-anomaly detection.
//!
//! Three independent sub-checks, additive before clamping:
//!
//! 1. z-score outliers of the current bids against a comparable historical
//!    price sample (same CPV, widened with the authority's tenders),
//! 2. an unsupervised outlier model fitted over historical plus current
//!    prices when the sample is large enough,
//! 3. the spread of the current bids themselves (coefficient of variation):
//!    near-identical bids point at coordination, a very wide spread at an
//!    unreliable estimate or a rigged low bid.
//!
//! Undersized samples skip checks 1 and 2 without penalty.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::config::PriceAnomalyConfig;
use crate::domain::stats::{coefficient_of_variation, decimal_to_f64, mean, std_dev, z_score};
use crate::domain::{tags, Detection, Score};
use crate::error::DetectorError;
use crate::port::AnomalyModel;

use super::{read_or, DetectionContext, Detector, Reader};

const LOW_OUTLIER_POINTS: f64 = 25.0;
const HIGH_OUTLIER_POINTS: f64 = 15.0;
const MODEL_POINTS: f64 = 20.0;
const SIMILAR_BIDS_POINTS: f64 = 30.0;
const WIDE_SPREAD_POINTS: f64 = 15.0;

/// Normalized model score above which the current bids count as anomalous.
const MODEL_DECISION: f64 = 0.5;

pub struct PriceAnomalyDetector {
    reader: Reader,
    config: PriceAnomalyConfig,
    model: Arc<dyn AnomalyModel>,
}

impl PriceAnomalyDetector {
    #[must_use]
    pub fn new(reader: Reader, config: PriceAnomalyConfig, model: Arc<dyn AnomalyModel>) -> Self {
        Self {
            reader,
            config,
            model,
        }
    }
}

#[async_trait]
impl Detector for PriceAnomalyDetector {
    fn name(&self) -> &'static str {
        "price_anomaly"
    }

    async fn detect(&self, ctx: &DetectionContext) -> Result<Detection, DetectorError> {
        let prices: Vec<f64> = ctx
            .bids
            .iter()
            .map(|b| decimal_to_f64(b.amount))
            .collect();
        if prices.is_empty() {
            return Ok(Detection::empty());
        }

        let sample: Vec<f64> = read_or(
            "price_sample",
            self.reader.price_sample(
                &ctx.tender.cpv_code,
                Some(&ctx.tender.authority_id),
                ctx.since(self.config.window_days),
            ),
            Vec::new(),
        )
        .await
        .into_iter()
        .map(decimal_to_f64)
        .collect();

        let mut score = Score::zero();
        let mut tags_out: Vec<String> = Vec::new();

        let hist_mean = mean(&sample);
        let hist_std = std_dev(&sample);

        // 1. z-score outliers against the historical sample.
        if sample.len() >= self.config.min_sample {
            let mut low_outlier = false;
            let mut high_outlier = false;
            for &p in &prices {
                let z = z_score(p, hist_mean, hist_std);
                if z <= -self.config.z_threshold {
                    low_outlier = true;
                } else if z >= self.config.z_threshold {
                    high_outlier = true;
                }
            }
            // Capped per tender: many outlier bids cannot saturate the
            // sub-score through this check alone.
            if low_outlier {
                score.add(LOW_OUTLIER_POINTS);
                tags_out.push(tags::ABNORMALLY_LOW_BID.to_string());
            }
            if high_outlier {
                score.add(HIGH_OUTLIER_POINTS);
                tags_out.push(tags::INFLATED_BID_PRICE.to_string());
            }
        }

        // 2. Unsupervised model over historical + current prices.
        let mut model_score: Option<f64> = None;
        if sample.len() >= self.config.model_min_sample {
            let mut training = sample.clone();
            training.extend_from_slice(&prices);
            let fitted = self.model.fit(&training);
            let current = mean(&fitted.score(&prices));
            model_score = Some(current);
            if current > MODEL_DECISION {
                score.add(MODEL_POINTS);
                tags_out.push(tags::ANOMALOUS_PRICE_PATTERN.to_string());
            }
        }

        // 3. Spread of the current bids.
        if prices.len() >= 2 {
            let cv = coefficient_of_variation(&prices);
            if cv < self.config.similar_cv && prices.len() > 2 {
                score.add(SIMILAR_BIDS_POINTS);
                tags_out.push(tags::SUSPICIOUSLY_SIMILAR_BIDS.to_string());
            } else if cv > self.config.spread_cv {
                score.add(WIDE_SPREAD_POINTS);
                tags_out.push(tags::UNUSUAL_BID_SPREAD.to_string());
            }
        }

        let details = json!({
            "historical_mean": hist_mean,
            "historical_std": hist_std,
            "historical_sample_size": sample.len(),
            "bid_prices": prices,
            "anomaly_model_score": model_score,
        });

        Ok(Detection {
            score,
            tags: tags_out,
            details,
        })
    }
}
