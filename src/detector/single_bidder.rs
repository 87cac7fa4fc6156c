//! Single-bidder risk detection.
//!
//! A tender awarded with exactly one bidder scores a 75-point base, then
//! bonuses for high contract value, critical sectors and authorities with a
//! trailing record of single-bidder awards. Tenders with no bids yet are not
//! assessable and return an empty detection.

use async_trait::async_trait;
use serde_json::json;

use crate::config::SingleBidderConfig;
use crate::domain::stats::decimal_to_f64;
use crate::domain::{tags, Detection, Score};
use crate::error::DetectorError;

use super::{read_or, DetectionContext, Detector, Reader};

const BASE_SCORE: f64 = 75.0;
const HIGH_VALUE_BONUS: f64 = 15.0;
const CRITICAL_SECTOR_BONUS: f64 = 10.0;
const REPEAT_AUTHORITY_BONUS: f64 = 20.0;

pub struct SingleBidderDetector {
    reader: Reader,
    config: SingleBidderConfig,
}

impl SingleBidderDetector {
    #[must_use]
    pub fn new(reader: Reader, config: SingleBidderConfig) -> Self {
        Self { reader, config }
    }

    fn is_critical_sector(&self, cpv_code: &str) -> bool {
        self.config
            .critical_cpv_prefixes
            .iter()
            .any(|p| cpv_code.starts_with(p.as_str()))
    }
}

#[async_trait]
impl Detector for SingleBidderDetector {
    fn name(&self) -> &'static str {
        "single_bidder"
    }

    async fn detect(&self, ctx: &DetectionContext) -> Result<Detection, DetectorError> {
        let bid_count = ctx.bids.len();
        if bid_count == 0 {
            // No award activity yet; nothing to assess.
            return Ok(Detection::empty());
        }

        let authority_history = read_or(
            "single_bidder_count",
            self.reader.single_bidder_count(
                &ctx.tender.authority_id,
                ctx.since(self.config.window_days),
            ),
            0,
        )
        .await;

        let mut score = Score::zero();
        let mut tags_out: Vec<String> = Vec::new();

        if bid_count == 1 {
            score.add(BASE_SCORE);
            tags_out.push(tags::SINGLE_BIDDER.to_string());

            let high_value = ctx
                .tender
                .estimated_value
                .is_some_and(|v| v > self.config.high_value_threshold);
            if high_value {
                score.add(HIGH_VALUE_BONUS);
                tags_out.push(tags::HIGH_VALUE_SINGLE_BIDDER.to_string());
            }

            if self.is_critical_sector(&ctx.tender.cpv_code) {
                score.add(CRITICAL_SECTOR_BONUS);
                tags_out.push(tags::CRITICAL_SECTOR_SINGLE_BIDDER.to_string());
            }

            if authority_history >= self.config.repeat_authority_threshold {
                score.add(REPEAT_AUTHORITY_BONUS);
                tags_out.push(tags::REPEAT_SINGLE_BIDDER_AUTHORITY.to_string());
            }
        }

        let details = json!({
            "bid_count": bid_count,
            "tender_value": ctx.tender.estimated_value.map(decimal_to_f64),
            "cpv_code": ctx.tender.cpv_code,
            "authority_history_count": authority_history,
        });

        Ok(Detection {
            score,
            tags: tags_out,
            details,
        })
    }
}
