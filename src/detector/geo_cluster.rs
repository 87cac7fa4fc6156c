//! Geographic clustering risk detection.
//!
//! Checks whether the winning company's results concentrate inside a
//! bounded radius of the contracting authority: the set of authorities
//! within the radius forms the cluster, and the company's win rate across
//! that cluster is scored. A registered address right next to the authority
//! adds a bounded proximity bonus when the cluster already leans the
//! company's way. Missing coordinates on either side make the tender
//! unassessable for this detector.

use async_trait::async_trait;
use serde_json::json;

use crate::config::GeoClusterConfig;
use crate::domain::stats::haversine_km;
use crate::domain::{tags, Detection, Score};
use crate::error::DetectorError;
use crate::port::ClusterPerformance;

use super::{read_or, DetectionContext, Detector, Reader};

const CLUSTER_RATE_POINTS: f64 = 35.0;
const MONOPOLY_POINTS: f64 = 25.0;
const PROXIMITY_POINTS: f64 = 15.0;

/// Cluster win rate at or above which the proximity bonus may apply.
const PROXIMITY_MIN_RATE: f64 = 0.5;

pub struct GeoClusterDetector {
    reader: Reader,
    config: GeoClusterConfig,
}

impl GeoClusterDetector {
    #[must_use]
    pub fn new(reader: Reader, config: GeoClusterConfig) -> Self {
        Self { reader, config }
    }
}

#[async_trait]
impl Detector for GeoClusterDetector {
    fn name(&self) -> &'static str {
        "geographic_clustering"
    }

    async fn detect(&self, ctx: &DetectionContext) -> Result<Detection, DetectorError> {
        let Some(winner) = ctx.winning_bid() else {
            return Ok(Detection::empty());
        };
        let company_id = winner.company_id.clone();

        let authority = read_or(
            "authority",
            self.reader.authority(&ctx.tender.authority_id),
            None,
        )
        .await;
        let company = read_or("company", self.reader.company(&company_id), None).await;

        let (Some(authority_loc), Some(company_loc)) = (
            authority.and_then(|a| a.location),
            company.and_then(|c| c.location),
        ) else {
            // Geocoordinates missing on either side.
            return Ok(Detection::empty());
        };

        let since = ctx.since(self.config.window_days);
        let nearby = read_or(
            "nearby_authorities",
            self.reader
                .nearby_authorities(authority_loc, self.config.radius_km),
            Vec::new(),
        )
        .await;
        let performance = read_or(
            "cluster_performance",
            self.reader.cluster_performance(&company_id, &nearby, since),
            ClusterPerformance::default(),
        )
        .await;

        let distance_km = haversine_km(company_loc, authority_loc);

        let mut score = Score::zero();
        let mut tags_out: Vec<String> = Vec::new();
        let win_rate = performance.win_rate();

        if performance.total >= self.config.min_cluster_tenders {
            if win_rate >= self.config.cluster_win_rate {
                score.add(CLUSTER_RATE_POINTS);
                tags_out.push(tags::HIGH_GEOGRAPHIC_CLUSTER_WIN_RATE.to_string());
                if win_rate >= self.config.monopoly_win_rate {
                    score.add(MONOPOLY_POINTS);
                    tags_out.push(tags::GEOGRAPHIC_MONOPOLY_PATTERN.to_string());
                }
            }

            if distance_km <= self.config.proximity_km && win_rate >= PROXIMITY_MIN_RATE {
                score.add(PROXIMITY_POINTS);
                tags_out.push(tags::CLOSE_PROXIMITY_WINNER.to_string());
            }
        }

        let details = json!({
            "cluster_win_rate": win_rate,
            "cluster_tender_count": performance.total,
            "cluster_win_count": performance.wins,
            "nearby_authority_count": nearby.len(),
            "distance_analysis": {
                "company_to_authority_km": distance_km,
                "proximity_threshold_km": self.config.proximity_km,
            },
        });

        Ok(Detection {
            score,
            tags: tags_out,
            details,
        })
    }
}
