//! Cross-tender pattern mining.
//!
//! Runs as a separate, lower-frequency batch job over the trailing window
//! and publishes immutable [`Pattern`] snapshots into a [`PatternStore`].
//! The per-tender path only ever reads the store; an empty or stale store
//! is absent context, never an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::PatternConfig;
use crate::domain::stats::month_key;
use crate::domain::{AuthorityId, CompanyId, Pattern, PatternKind, TenderId};
use crate::error::Result;
use crate::port::{AwardSummary, HistoryReader};

/// Shared read-mostly snapshot of the latest mining run.
#[derive(Default)]
pub struct PatternStore {
    inner: RwLock<Vec<Pattern>>,
}

impl PatternStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a fresh mining result.
    pub fn replace(&self, patterns: Vec<Pattern>) {
        *self.inner.write() = patterns;
    }

    /// Active patterns involving the given authority or company.
    #[must_use]
    pub fn matching(&self, authority: &AuthorityId, company: Option<&CompanyId>) -> Vec<Pattern> {
        self.inner
            .read()
            .iter()
            .filter(|p| p.active && p.involves(authority, company))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Pattern> {
        self.inner.read().clone()
    }
}

/// Batch miner for systemic award patterns.
pub struct PatternMiner {
    reader: Arc<dyn HistoryReader>,
    config: PatternConfig,
}

impl PatternMiner {
    #[must_use]
    pub fn new(reader: Arc<dyn HistoryReader>, config: PatternConfig) -> Self {
        Self { reader, config }
    }

    /// Mine the trailing window ending at `now`.
    pub async fn mine(&self, now: DateTime<Utc>) -> Result<Vec<Pattern>> {
        let since = now - Duration::days(self.config.window_days);
        let awards = self.reader.award_summaries(since).await?;

        let mut patterns = Vec::new();
        patterns.extend(self.authority_patterns(&awards, now));
        patterns.extend(self.sector_patterns(&awards, now));
        patterns.extend(self.temporal_patterns(&awards, now));

        info!(
            awards = awards.len(),
            patterns = patterns.len(),
            "pattern mining finished"
        );
        Ok(patterns)
    }

    /// Mine and publish into the store. Failures keep the previous snapshot:
    /// patterns are advisory and must never block scoring.
    pub async fn refresh(&self, store: &PatternStore, now: DateTime<Utc>) {
        match self.mine(now).await {
            Ok(patterns) => store.replace(patterns),
            Err(err) => warn!(error = %err, "pattern mining failed, keeping previous snapshot"),
        }
    }

    /// Company-monopoly and authority-favoritism findings per authority.
    fn authority_patterns(&self, awards: &[AwardSummary], now: DateTime<Utc>) -> Vec<Pattern> {
        // BTreeMap grouping keeps output order deterministic.
        let mut by_authority: BTreeMap<&AuthorityId, Vec<&AwardSummary>> = BTreeMap::new();
        for award in awards {
            by_authority.entry(&award.authority_id).or_default().push(award);
        }

        let mut patterns = Vec::new();
        for (authority, awards) in by_authority {
            let total = awards.len() as u32;
            let mut by_company: BTreeMap<&CompanyId, Vec<&AwardSummary>> = BTreeMap::new();
            for award in &awards {
                by_company.entry(&award.company_id).or_default().push(award);
            }

            for (company, won) in by_company {
                let wins = won.len() as u32;
                let share = f64::from(wins) / f64::from(total);

                if wins >= self.config.monopoly_min_wins && share > self.config.monopoly_share {
                    patterns.push(Pattern {
                        kind: PatternKind::CompanyMonopoly,
                        tenders: ids_of(&won),
                        companies: vec![company.clone()],
                        authorities: vec![authority.clone()],
                        score: (share * 100.0).min(100.0),
                        discovered_at: now,
                        active: true,
                    });
                }

                if total >= self.config.favoritism_min_awards
                    && share > self.config.monopoly_share
                {
                    patterns.push(Pattern {
                        kind: PatternKind::AuthorityFavoritism,
                        tenders: ids_of(&won),
                        companies: vec![company.clone()],
                        authorities: vec![authority.clone()],
                        score: (share * 100.0).min(100.0),
                        discovered_at: now,
                        active: true,
                    });
                }
            }
        }
        patterns
    }

    /// Companies dominating a CPV sector.
    fn sector_patterns(&self, awards: &[AwardSummary], now: DateTime<Utc>) -> Vec<Pattern> {
        let mut by_sector: BTreeMap<&str, Vec<&AwardSummary>> = BTreeMap::new();
        for award in awards {
            // Byte slicing would panic on a malformed, non-ASCII CPV code.
            let prefix = award.cpv_code.get(..2).unwrap_or(&award.cpv_code);
            by_sector.entry(prefix).or_default().push(award);
        }

        let mut patterns = Vec::new();
        for (_, sector_awards) in by_sector {
            let total = sector_awards.len() as u32;
            let mut by_company: BTreeMap<&CompanyId, Vec<&AwardSummary>> = BTreeMap::new();
            for award in &sector_awards {
                by_company.entry(&award.company_id).or_default().push(award);
            }
            for (company, won) in by_company {
                let wins = won.len() as u32;
                let share = f64::from(wins) / f64::from(total);
                if wins >= self.config.sector_min_wins && share > self.config.sector_share {
                    patterns.push(Pattern {
                        kind: PatternKind::SectorConcentration,
                        tenders: ids_of(&won),
                        companies: vec![company.clone()],
                        authorities: authorities_of(&won),
                        score: (share * 100.0).min(100.0),
                        discovered_at: now,
                        active: true,
                    });
                }
            }
        }
        patterns
    }

    /// Companies whose wins bunch into one month.
    fn temporal_patterns(&self, awards: &[AwardSummary], now: DateTime<Utc>) -> Vec<Pattern> {
        let mut by_company: BTreeMap<&CompanyId, Vec<&AwardSummary>> = BTreeMap::new();
        for award in awards {
            by_company.entry(&award.company_id).or_default().push(award);
        }

        let mut patterns = Vec::new();
        for (company, won) in by_company {
            let total = won.len() as u32;
            if total < self.config.temporal_min_wins {
                continue;
            }
            let mut by_month: BTreeMap<String, Vec<&AwardSummary>> = BTreeMap::new();
            for award in &won {
                by_month
                    .entry(month_key(award.awarded_at))
                    .or_default()
                    .push(award);
            }
            if let Some((_, month_awards)) = by_month
                .iter()
                .max_by_key(|(month, awards)| (awards.len(), std::cmp::Reverse(month.as_str())))
            {
                let share = month_awards.len() as f64 / f64::from(total);
                if share > self.config.temporal_month_share {
                    patterns.push(Pattern {
                        kind: PatternKind::TemporalClustering,
                        tenders: month_awards.iter().map(|a| a.tender_id.clone()).collect(),
                        companies: vec![(*company).clone()],
                        authorities: authorities_of(&won),
                        score: (share * 100.0).min(100.0),
                        discovered_at: now,
                        active: true,
                    });
                }
            }
        }
        patterns
    }
}

fn ids_of(awards: &[&AwardSummary]) -> Vec<TenderId> {
    awards.iter().map(|a| a.tender_id.clone()).collect()
}

fn authorities_of(awards: &[&AwardSummary]) -> Vec<AuthorityId> {
    let mut out: Vec<AuthorityId> = Vec::new();
    for award in awards {
        if !out.contains(&award.authority_id) {
            out.push(award.authority_id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{self, MemoryHistory};
    use rust_decimal_macros::dec;

    fn miner(history: MemoryHistory) -> PatternMiner {
        PatternMiner::new(Arc::new(history), PatternConfig::default())
    }

    /// c-1 wins 6 of 8 awarded tenders of a-1, spread across months.
    fn monopoly_history() -> (MemoryHistory, DateTime<Utc>) {
        let now = testkit::fixed_now();
        let mut history = MemoryHistory::new();
        for i in 0..8u32 {
            let id = format!("t-{i}");
            let company = if i < 6 { "c-1" } else { "c-2" };
            let when = now - Duration::days(10 + i64::from(i) * 30);
            let t = testkit::tender(&id, "a-1", "45230000", dec!(100_000), when);
            let b = vec![testkit::bid(&id, company, dec!(95_000), true, when)];
            history.add_tender_with_bids(t, b);
        }
        (history, now)
    }

    #[tokio::test]
    async fn detects_company_monopoly_and_favoritism() {
        let (history, now) = monopoly_history();
        let patterns = miner(history).mine(now).await.unwrap();

        let monopoly: Vec<_> = patterns
            .iter()
            .filter(|p| p.kind == PatternKind::CompanyMonopoly)
            .collect();
        assert_eq!(monopoly.len(), 1);
        assert_eq!(monopoly[0].companies, vec![CompanyId::from("c-1")]);
        assert_eq!(monopoly[0].authorities, vec![AuthorityId::from("a-1")]);
        assert_eq!(monopoly[0].score, 75.0);

        assert!(patterns
            .iter()
            .any(|p| p.kind == PatternKind::AuthorityFavoritism));
    }

    #[tokio::test]
    async fn no_pattern_below_thresholds() {
        let now = testkit::fixed_now();
        let mut history = MemoryHistory::new();
        // 4 wins: below the 5-win monopoly floor.
        for i in 0..4u32 {
            let id = format!("t-{i}");
            let when = now - Duration::days(10 + i64::from(i) * 40);
            let t = testkit::tender(&id, "a-1", "45230000", dec!(100_000), when);
            let b = vec![testkit::bid(&id, "c-1", dec!(95_000), true, when)];
            history.add_tender_with_bids(t, b);
        }
        let patterns = miner(history).mine(now).await.unwrap();
        assert!(patterns
            .iter()
            .all(|p| p.kind != PatternKind::CompanyMonopoly));
    }

    #[tokio::test]
    async fn temporal_clustering_detected() {
        let now = testkit::fixed_now();
        let mut history = MemoryHistory::new();
        // 6 wins, 4 of them inside one month.
        for i in 0..6u32 {
            let id = format!("t-{i}");
            let when = if i < 4 {
                now - Duration::days(30 + i64::from(i))
            } else {
                now - Duration::days(120 + i64::from(i) * 35)
            };
            let t = testkit::tender(&id, "a-1", "45230000", dec!(100_000), when);
            let b = vec![testkit::bid(&id, "c-1", dec!(95_000), true, when)];
            history.add_tender_with_bids(t, b);
        }
        let patterns = miner(history).mine(now).await.unwrap();
        assert!(patterns
            .iter()
            .any(|p| p.kind == PatternKind::TemporalClustering));
    }

    #[tokio::test]
    async fn malformed_cpv_codes_do_not_break_mining() {
        let now = testkit::fixed_now();
        let mut history = MemoryHistory::new();
        let when = now - Duration::days(5);
        let t = testkit::tender("t-1", "a-1", "€", dec!(10_000), when);
        let b = vec![testkit::bid("t-1", "c-1", dec!(9_000), true, when)];
        history.add_tender_with_bids(t, b);

        let patterns = miner(history).mine(now).await.unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn store_matching_filters_by_involvement() {
        let store = PatternStore::new();
        store.replace(vec![Pattern {
            kind: PatternKind::CompanyMonopoly,
            tenders: vec![],
            companies: vec![CompanyId::from("c-1")],
            authorities: vec![AuthorityId::from("a-1")],
            score: 80.0,
            discovered_at: Utc::now(),
            active: true,
        }]);

        assert_eq!(store.matching(&AuthorityId::from("a-1"), None).len(), 1);
        assert_eq!(store.matching(&AuthorityId::from("a-9"), None).len(), 0);
        assert_eq!(
            store
                .matching(&AuthorityId::from("a-9"), Some(&CompanyId::from("c-1")))
                .len(),
            1
        );
    }
}
