//! Frequent-winner risk detection.
//!
//! Looks at the winning company's trailing record: win rate against the
//! same authority, win rate in the same CPV sector, and the shape of its
//! monthly win series. Scopes with too few participations contribute
//! nothing.

use async_trait::async_trait;
use serde_json::json;

use crate::config::FrequentWinnerConfig;
use crate::domain::stats::{mean, std_dev};
use crate::domain::{tags, Detection, Score};
use crate::error::DetectorError;
use crate::port::{Participation, ParticipationScope};

use super::{read_or, DetectionContext, Detector, Reader};

const AUTHORITY_RATE_POINTS: f64 = 40.0;
const AUTHORITY_EXTREME_POINTS: f64 = 20.0;
const SECTOR_RATE_POINTS: f64 = 25.0;
const STEADY_WINS_POINTS: f64 = 15.0;
const SPIKE_POINTS: f64 = 10.0;

pub struct FrequentWinnerDetector {
    reader: Reader,
    config: FrequentWinnerConfig,
}

impl FrequentWinnerDetector {
    #[must_use]
    pub fn new(reader: Reader, config: FrequentWinnerConfig) -> Self {
        Self { reader, config }
    }
}

#[async_trait]
impl Detector for FrequentWinnerDetector {
    fn name(&self) -> &'static str {
        "frequent_winner"
    }

    async fn detect(&self, ctx: &DetectionContext) -> Result<Detection, DetectorError> {
        let Some(winner) = ctx.winning_bid() else {
            // No award yet.
            return Ok(Detection::empty());
        };
        let company = winner.company_id.clone();
        let since = ctx.since(self.config.window_days);

        let authority_scope = ParticipationScope::Authority(ctx.tender.authority_id.clone());
        let sector_scope = ParticipationScope::Sector(ctx.tender.cpv_prefix().to_string());

        let by_authority = read_or(
            "participation(authority)",
            self.reader.participation(&company, &authority_scope, since),
            Participation::default(),
        )
        .await;
        let by_sector = read_or(
            "participation(sector)",
            self.reader.participation(&company, &sector_scope, since),
            Participation::default(),
        )
        .await;
        let monthly = read_or(
            "monthly_wins",
            self.reader.monthly_wins(&company, since),
            Default::default(),
        )
        .await;

        let mut score = Score::zero();
        let mut tags_out: Vec<String> = Vec::new();

        if by_authority.participations >= self.config.min_participations {
            let rate = by_authority.win_rate();
            if rate >= self.config.authority_win_rate {
                score.add(AUTHORITY_RATE_POINTS);
                tags_out.push(tags::HIGH_AUTHORITY_WIN_RATE.to_string());
                if rate >= self.config.extreme_authority_win_rate {
                    score.add(AUTHORITY_EXTREME_POINTS);
                    tags_out.push(tags::EXTREMELY_HIGH_AUTHORITY_WIN_RATE.to_string());
                }
            }
        }

        if by_sector.participations >= self.config.min_participations
            && by_sector.win_rate() >= self.config.sector_win_rate
        {
            score.add(SECTOR_RATE_POINTS);
            tags_out.push(tags::HIGH_SECTOR_WIN_RATE.to_string());
        }

        // Temporal shape of the monthly win series.
        let counts: Vec<f64> = monthly.values().map(|&c| f64::from(c)).collect();
        let monthly_mean = mean(&counts);
        let monthly_std = std_dev(&counts);
        if !counts.is_empty() {
            let cv = if monthly_mean == 0.0 {
                0.0
            } else {
                monthly_std / monthly_mean
            };
            if cv < self.config.monthly_cv && monthly_mean > 1.0 {
                score.add(STEADY_WINS_POINTS);
                tags_out.push(tags::CONSISTENT_MONTHLY_WINS.to_string());
            }
            if monthly_std > 0.0
                && counts
                    .iter()
                    .any(|&c| c > monthly_mean + 2.0 * monthly_std)
            {
                score.add(SPIKE_POINTS);
                tags_out.push(tags::WIN_CONCENTRATION_SPIKE.to_string());
            }
        }

        let details = json!({
            "company_id": company,
            "authority_scope": {
                "participations": by_authority.participations,
                "wins": by_authority.wins,
                "win_rate": by_authority.win_rate(),
            },
            "sector_scope": {
                "cpv_prefix": ctx.tender.cpv_prefix(),
                "participations": by_sector.participations,
                "wins": by_sector.wins,
                "win_rate": by_sector.win_rate(),
            },
            "monthly_wins": monthly,
            "monthly_mean": monthly_mean,
            "monthly_std": monthly_std,
        });

        Ok(Detection {
            score,
            tags: tags_out,
            details,
        })
    }
}
